use super::*;

#[test]
fn test_auto_chunk_size_never_zero() {
    assert_eq!(auto_chunk_size(0), 1);
    assert_eq!(auto_chunk_size(1), 1);
    assert!(auto_chunk_size(1_000_000) >= 1);
}

#[test]
fn test_par_chunks_mut_auto_offsets() {
    let mut data: Vec<usize> = vec![0; 100];
    data.par_chunks_mut_auto().for_each(|(offset, chunk)| {
        for (i, val) in chunk.iter_mut().enumerate() {
            *val = offset + i;
        }
    });
    for (i, &v) in data.iter().enumerate() {
        assert_eq!(v, i);
    }
}

#[test]
fn test_par_chunks_mut_auto_empty() {
    let mut data: Vec<u8> = Vec::new();
    let visited = data.par_chunks_mut_auto().count();
    assert_eq!(visited, 0);
}

#[test]
fn test_par_units_mut_auto_plane_alignment() {
    let plane_len = 12;
    let depth = 17;
    let mut data: Vec<u32> = vec![0; plane_len * depth];

    data.par_units_mut_auto(plane_len)
        .for_each(|(first_plane, chunk)| {
            assert_eq!(chunk.len() % plane_len, 0, "Chunk not plane-aligned");
            for (k, plane) in chunk.chunks_mut(plane_len).enumerate() {
                plane.fill((first_plane + k) as u32);
            }
        });

    for z in 0..depth {
        assert!(data[z * plane_len..(z + 1) * plane_len]
            .iter()
            .all(|&v| v == z as u32));
    }
}

#[test]
fn test_par_units_mut_auto_single_unit() {
    let mut data = vec![1.0f32; 5];
    data.par_units_mut_auto(5).for_each(|(first, chunk)| {
        assert_eq!(first, 0);
        assert_eq!(chunk.len(), 5);
    });
}

#[test]
#[should_panic(expected = "not a multiple of unit_len")]
fn test_par_units_mut_auto_rejects_ragged_slice() {
    let mut data = vec![0u8; 10];
    data.par_units_mut_auto(3).for_each(|_| {});
}

#[test]
fn test_chunking_borrowed_elements() {
    let names: Vec<String> = (0..20).map(|i| format!("tile{i}")).collect();
    let mut refs: Vec<&String> = names.iter().collect();
    refs.par_units_mut_auto(4).for_each(|(first_unit, chunk)| {
        assert_eq!(chunk.len() % 4, 0);
        assert_eq!(*chunk[0], format!("tile{}", first_unit * 4));
        chunk.reverse();
    });
    let total: usize = refs.par_chunks_mut_auto().map(|(_, c)| c.len()).sum();
    assert_eq!(total, 20);
}
