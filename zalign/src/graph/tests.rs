use super::*;
use crate::testing::gaussian_curve;
use crate::tile::TileId;

fn tile(channel: &str, index: usize, center: f32) -> Tile {
    Tile::with_curve(
        TileId::new("/data", "run1", channel, index),
        gaussian_curve(48, center, 4.0),
    )
}

#[test]
fn test_all_ordered_pairs_measured() {
    let tiles = vec![tile("GFP", 0, 20.0), tile("GFP", 1, 23.0), tile("GFP", 2, 26.0)];
    let offsets = measure_pairs(&tiles, &AlignConfig::default());

    let pairs: Vec<(usize, usize)> = offsets.iter().map(|o| (o.source, o.target)).collect();
    assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]);

    for o in &offsets {
        let expected = 3.0 * (o.target as f32 - o.source as f32);
        assert!(
            (o.offset - expected).abs() < 0.1,
            "{} -> {}: {}",
            o.source,
            o.target,
            o.offset
        );
        assert_eq!(o.target_tile_index, o.target);
    }
}

#[test]
fn test_offsets_split_by_channel() {
    let mut tiles = vec![tile("GFP", 0, 20.0), tile("GFP", 1, 22.0), tile("RFP", 0, 20.0)];
    let offsets = build_measurement_graph(&mut tiles, &AlignConfig::default());
    assert_eq!(offsets.len(), 6);

    assert_eq!(tiles[0].same_channel.len(), 1);
    assert_eq!(tiles[0].same_channel[0].target, 1);
    assert_eq!(tiles[0].other_channel.len(), 1);
    assert_eq!(tiles[0].other_channel[0].target, 2);

    assert!(tiles[2].same_channel.is_empty());
    assert_eq!(tiles[2].other_channel.len(), 2);
}

#[test]
fn test_tiles_without_curve_are_skipped() {
    let mut tiles = vec![
        tile("GFP", 0, 20.0),
        Tile::new(TileId::new("/data", "run1", "GFP", 1)),
        tile("GFP", 2, 24.0),
    ];
    let offsets = build_measurement_graph(&mut tiles, &AlignConfig::default());
    assert_eq!(offsets.len(), 2);
    assert!(offsets.iter().all(|o| o.source != 1 && o.target != 1));
    assert!(tiles[1].same_channel.is_empty());
}

#[test]
fn test_single_tile_has_no_pairs() {
    let mut tiles = vec![tile("GFP", 0, 20.0)];
    assert!(build_measurement_graph(&mut tiles, &AlignConfig::default()).is_empty());
}

#[test]
fn test_empty_curves_are_not_measured() {
    let mut tiles = vec![
        tile("GFP", 0, 20.0),
        Tile::with_curve(TileId::new("/data", "run1", "GFP", 1), Vec::new()),
        tile("GFP", 2, 24.0),
    ];
    let offsets = build_measurement_graph(&mut tiles, &AlignConfig::default());
    let pairs: Vec<(usize, usize)> = offsets.iter().map(|o| (o.source, o.target)).collect();
    assert_eq!(pairs, vec![(0, 2), (2, 0)]);
    assert!(tiles[1].same_channel.is_empty());
}
