use std::io::Write;

use graph_builder::prelude::*;

fn write_el64(path: &std::path::Path, edges: &[(i64, i64)], num_vertices: usize) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(
        file,
        "--num_vertices {} --num_edges {} --is_deduped --format el64",
        num_vertices,
        edges.len()
    )
    .unwrap();
    for &(s, d) in edges {
        file.write_all(&s.to_le_bytes()).unwrap();
        file.write_all(&d.to_le_bytes()).unwrap();
    }
}

/// Scenario S1 from the kernel test matrix: a 4-vertex path.
#[test]
fn loads_and_builds_path_graph() -> Result<(), Error> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s1.el64");
    write_el64(&path, &[(0, 1), (1, 2), (2, 3)], 4);

    let edge_list = DistEdgeList::<usize>::load_binary(&path)?;
    assert_eq!(edge_list.num_vertices(), 4);
    assert_eq!(edge_list.num_edges(), 3);

    let config = GraphConfig { sort_adjacency: true, ..GraphConfig::default() };
    let graph = Graph::<usize, ()>::build(&edge_list, &config)?;

    assert!(graph.check(&edge_list));
    assert_eq!(graph.degree(0), 1);
    assert_eq!(graph.degree(1), 2);
    assert_eq!(graph.degree(2), 2);
    assert_eq!(graph.degree(3), 1);
    assert_eq!(graph.sorted_adjacency(1), &[0, 2]);

    Ok(())
}

/// Scenario S2: a single triangle, used by triangle count and k-truss.
#[test]
fn loads_and_builds_triangle() -> Result<(), Error> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s2.el64");
    write_el64(&path, &[(0, 1), (1, 2), (0, 2)], 3);

    let edge_list = DistEdgeList::<usize>::load_binary(&path)?;
    let config = GraphConfig { sort_adjacency: true, ..GraphConfig::default() };
    let graph = Graph::<usize, ()>::build(&edge_list, &config)?;

    for v in 0..3 {
        assert_eq!(graph.degree(v), 2);
        assert_eq!(graph.num_edge_blocks(v), 1);
    }
    assert!(graph.check(&edge_list));

    Ok(())
}
