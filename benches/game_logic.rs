use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cube_tetris::core::{commit, is_valid_placement, try_rotate, CubeGrids, GameSnapshot, Piece, Session};
use cube_tetris::types::{Intent, PieceKind, FACE_HEIGHT, FACE_WIDTH, NUM_FACES};

fn bench_tick(c: &mut Criterion) {
    let mut session = Session::new(12345);
    session.apply_intent(Intent::Start);

    c.bench_function("session_tick_16ms", |b| {
        b.iter(|| {
            session.tick(black_box(16));
        })
    });
}

fn bench_commit_with_clear(c: &mut Criterion) {
    c.bench_function("commit_clear_4_cube_rows", |b| {
        b.iter(|| {
            let mut grids = CubeGrids::new();
            // Bottom 4 rows full on every face except face 0 column 0
            for face in 0..NUM_FACES {
                for y in (FACE_HEIGHT as i32 - 4)..FACE_HEIGHT as i32 {
                    for x in 0..FACE_WIDTH as i32 {
                        if face != 0 || x != 0 {
                            grids.face_mut(face).set(x, y, Some(PieceKind::J));
                        }
                    }
                }
            }
            let vertical_i = Piece::spawn(PieceKind::I).rotated().with_x(0).moved(0, FACE_HEIGHT as i32 - 4);
            commit(&mut grids, 0, black_box(&vertical_i))
        })
    });
}

fn bench_validity_across_seam(c: &mut Criterion) {
    let grids = CubeGrids::new();
    let piece = Piece::spawn(PieceKind::T);

    c.bench_function("valid_placement_across_seam", |b| {
        b.iter(|| is_valid_placement(&grids, black_box(1), &piece.shape, black_box(8), black_box(10)))
    });
}

fn bench_try_rotate(c: &mut Criterion) {
    let grids = CubeGrids::new();
    let piece = Piece::spawn(PieceKind::L);

    c.bench_function("try_rotate", |b| {
        b.iter(|| try_rotate(&grids, black_box(2), black_box(&piece)))
    });
}

fn bench_snapshot_into(c: &mut Criterion) {
    let mut session = Session::new(12345);
    session.apply_intent(Intent::Start);
    let mut snap = GameSnapshot::default();

    c.bench_function("snapshot_into", |b| {
        b.iter(|| {
            session.snapshot_into(&mut snap);
        })
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_commit_with_clear,
    bench_validity_across_seam,
    bench_try_rotate,
    bench_snapshot_into
);
criterion_main!(benches);
