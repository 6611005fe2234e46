//! Round-trip and version-gate properties of the binary terrain format.

use osmterra_terrain::{
    calc_approx_size, TerrainCell, TerrainCodec, TerrainError, TerrainGrid, FORMAT_VERSION,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_grid(rng: &mut ChaCha8Rng, max_height: f32) -> TerrainGrid {
    let size = rng.gen_range(1..24);
    let name_count = rng.gen_range(1..12);

    let mut grid = TerrainGrid::square(size);
    grid.set_materials((0..name_count).map(|i| format!("material_{}", i)).collect());
    for cell in grid.cells_mut() {
        *cell = TerrainCell {
            height: rng.gen_range(0.0..=max_height),
            material: rng.gen_range(0..name_count),
            is_hole: rng.gen_bool(0.1),
        };
    }
    grid
}

#[test]
fn test_roundtrip_within_quantization() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7e44a1);

    for _ in 0..200 {
        let max_height = rng.gen_range(0.5f32..5000.0);
        let grid = random_grid(&mut rng, max_height);
        let codec = TerrainCodec::new(max_height);

        let bytes = codec.encode(&grid).expect("encode");
        assert_eq!(bytes.len(), calc_approx_size(grid.width(), grid.materials()));
        let decoded = codec.decode(&bytes).expect("decode");

        assert_eq!(decoded.width(), grid.width());
        assert_eq!(decoded.materials(), grid.materials());

        // Half a step from rounding plus f32 slack.
        let tolerance = max_height / 65535.0 * 1.01;
        for (original, restored) in grid.cells().iter().zip(decoded.cells()) {
            assert_eq!(restored.is_hole, original.is_hole);
            if original.is_hole {
                assert_eq!(restored.material, 0);
            } else {
                assert_eq!(restored.material, original.material);
            }
            assert!(
                (restored.height - original.height).abs() <= tolerance,
                "height {} restored as {} (max {})",
                original.height,
                restored.height,
                max_height
            );
        }
    }
}

#[test]
fn test_out_of_range_heights_clamp() {
    let mut grid = TerrainGrid::square(2);
    grid.cells_mut()[0].height = -40.0;
    grid.cells_mut()[1].height = 900.0;

    let codec = TerrainCodec::new(100.0);
    let decoded = codec.decode(&codec.encode(&grid).unwrap()).unwrap();
    assert_eq!(decoded.cells()[0].height, 0.0);
    assert_eq!(decoded.cells()[1].height, 100.0);
}

#[test]
fn test_version_gate() {
    let mut grid = TerrainGrid::square(4);
    grid.add_material("grass");
    let codec = TerrainCodec::new(100.0);

    let mut bytes = codec.encode(&grid).unwrap();
    assert_eq!(bytes[0], FORMAT_VERSION);
    bytes[0] = 8;

    match codec.decode(&bytes) {
        Err(TerrainError::UnsupportedVersion { expected, found }) => {
            assert_eq!(expected, 9);
            assert_eq!(found, 8);
        }
        other => panic!("expected version error, got {:?}", other),
    }

    let lenient = codec.with_ignore_version(true);
    let decoded = lenient.decode(&bytes).expect("structure is intact");
    assert_eq!(decoded, codec.decode(&codec.encode(&grid).unwrap()).unwrap());
}

#[test]
fn test_ignore_version_still_rejects_trailing_bytes() {
    let codec = TerrainCodec::new(1.0).with_ignore_version(true);
    let mut bytes = codec.encode(&TerrainGrid::square(2)).unwrap();
    bytes[0] = 10;
    bytes.extend_from_slice(&[0, 0]);

    assert!(matches!(
        codec.decode(&bytes),
        Err(TerrainError::TrailingBytes { count: 2 })
    ));
}

#[test]
fn test_decode_rejects_dangling_material() {
    let mut grid = TerrainGrid::square(1);
    grid.set_materials(vec!["a".into(), "b".into()]);
    grid.cells_mut()[0].material = 1;
    let mut bytes = TerrainCodec::new(1.0).encode(&grid).unwrap();

    // Rewrite the name table to hold a single name: index 1 now dangles.
    let table_start = 5 + 2 + 1;
    bytes.truncate(table_start);
    bytes.extend_from_slice(&[1, 0, 0, 0, 1, b'a']);

    assert!(matches!(
        TerrainCodec::new(1.0).decode(&bytes),
        Err(TerrainError::MaterialOutOfRange { index: 1, count: 1, .. })
    ));
}

#[test]
fn test_calc_approx_size_exact() {
    assert_eq!(calc_approx_size::<&str>(0, &[]), 9);
    assert_eq!(calc_approx_size(1, &["a"]), 5 + 2 + 1 + 4 + 2);
    assert_eq!(calc_approx_size(256, &["grass", "rock"]), 5 + 3 * 65536 + 4 + 6 + 5);

    let bytes = TerrainCodec::new(1.0)
        .encode_template(17, TerrainCell::new(0.5, 1), &["grass", "rock"])
        .unwrap();
    assert_eq!(bytes.len(), calc_approx_size(17, &["grass", "rock"]));
}
