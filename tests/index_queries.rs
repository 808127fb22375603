use road_labeling::algo::flat_index::ContractionIndex;
use road_labeling::algo::hierarchy::ContractionHierarchy;
use road_labeling::algo::LabelingConfig;
use road_labeling::graph::store::Graph;
use road_labeling::graph::*;

fn build_with(g: &mut Graph, config: LabelingConfig) -> (ContractionHierarchy, ContractionIndex) {
    let closest = g.contract();
    let mut ci = g.create_cut_index(config);
    g.reset();
    let ch = ContractionHierarchy::build(g, &mut ci, &closest);
    let index = ContractionIndex::new(ci, &closest);
    (ch, index)
}

fn build(g: &mut Graph) -> (ContractionHierarchy, ContractionIndex) {
    build_with(g, LabelingConfig::default())
}

/// Ground truth, symmetry and identity over all ordered node pairs.
fn check_all_pairs(g: &Graph, index: &ContractionIndex) {
    for &v in g.nodes() {
        assert_eq!(index.get_distance(v, v), 0);
        assert_eq!(index.get_spc(v, v), 1);
        for &w in g.nodes() {
            let d = index.get_distance(v, w);
            let c = index.get_spc(v, w);
            assert_eq!(d, g.get_distance(v, w, true), "distance ({}, {})", v, w);
            assert_eq!(c, g.get_path_count(v, w), "spc ({}, {})", v, w);
            assert_eq!(d, index.get_distance(w, v), "distance symmetry ({}, {})", v, w);
            assert_eq!(c, index.get_spc(w, v), "spc symmetry ({}, {})", v, w);
            assert!(c < 32768);
        }
    }
}

#[test]
fn it_answers_queries_on_a_path() {
    // 1 --- 2 --- 3 --- 4 --- 5, unit weights
    let edges: Vec<Edge> = (1..5).map(|i| Edge::new(i, i + 1, 1)).collect();
    let mut g = Graph::with_edges(5, &edges);
    let (_, index) = build(&mut g);
    assert_eq!(index.get_distance(1, 5), 4);
    assert_eq!(index.get_spc(1, 5), 1);
    check_all_pairs(&g, &index);
}

#[test]
fn it_answers_queries_on_a_cycle() {
    //   1 --- 2
    //   |     |    unit 4-cycle: opposite corners tie both ways around
    //   4 --- 3
    let mut g = Graph::with_edges(
        4,
        &[Edge::new(1, 2, 1), Edge::new(2, 3, 1), Edge::new(3, 4, 1), Edge::new(4, 1, 1)],
    );
    let (_, index) = build(&mut g);
    assert_eq!(index.get_distance(1, 3), 2);
    assert_eq!(index.get_spc(1, 3), 2);
    check_all_pairs(&g, &index);
}

#[test]
fn it_answers_queries_on_a_bowtie() {
    //   1       4
    //   | \   / |     two unit triangles sharing node 3
    //   |  3    |
    //   | /   \ |
    //   2       5
    let mut g = Graph::with_edges(
        5,
        &[
            Edge::new(1, 2, 1),
            Edge::new(1, 3, 1),
            Edge::new(2, 3, 1),
            Edge::new(3, 4, 1),
            Edge::new(3, 5, 1),
            Edge::new(4, 5, 1),
        ],
    );
    let (_, index) = build(&mut g);
    assert_eq!(index.get_distance(1, 5), 2);
    // 1-3-5 is the only shortest path; 1-2-3-5 has length 3
    assert_eq!(index.get_spc(1, 5), 1);
    check_all_pairs(&g, &index);
}

fn grid(width: u32, height: u32, weight_of: impl Fn(u32, u32) -> Weight) -> Graph {
    let id = |x: u32, y: u32| y * width + x + 1;
    let mut edges = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if x + 1 < width {
                edges.push(Edge::new(id(x, y), id(x + 1, y), weight_of(x, y)));
            }
            if y + 1 < height {
                edges.push(Edge::new(id(x, y), id(x, y + 1), weight_of(x, y)));
            }
        }
    }
    Graph::with_edges((width * height) as usize, &edges)
}

#[test]
fn it_answers_queries_on_a_unit_grid() {
    let mut g = grid(3, 3, |_, _| 1);
    let (_, index) = build(&mut g);
    // the corner-to-corner count is the number of monotone lattice paths
    assert_eq!(index.get_distance(1, 9), 4);
    assert_eq!(index.get_spc(1, 9), 6);
    check_all_pairs(&g, &index);
}

#[test]
fn it_answers_queries_on_a_weighted_grid() {
    let mut g = grid(4, 4, |x, y| (x + 2 * y) % 3 + 1);
    let (_, index) = build(&mut g);
    check_all_pairs(&g, &index);
}

#[test]
fn it_answers_queries_with_pendant_trees() {
    //   6 --- 1 --- 2 --- 3 --- 7
    //               |
    //               4 --- 5          pendants on a short core
    let mut g = Graph::with_edges(
        7,
        &[
            Edge::new(1, 2, 2),
            Edge::new(2, 3, 1),
            Edge::new(1, 6, 3),
            Edge::new(3, 7, 1),
            Edge::new(2, 4, 2),
            Edge::new(4, 5, 4),
        ],
    );
    let (_, index) = build(&mut g);
    check_all_pairs(&g, &index);
    assert!(index.is_contracted(5));
    assert!(index.is_contracted(6));
}

#[test]
fn it_produces_identical_answers_without_shortcuts() {
    let mut with = grid(4, 3, |x, y| x + y + 1);
    let (_, index_with) = build(&mut with);
    let mut without = grid(4, 3, |x, y| x + y + 1);
    let config = LabelingConfig {
        shortcuts_enabled: false,
        ..LabelingConfig::default()
    };
    let (_, index_without) = build_with(&mut without, config);
    for &v in with.nodes() {
        for &w in with.nodes() {
            assert_eq!(index_with.get_distance(v, w), index_without.get_distance(v, w));
            assert_eq!(index_with.get_spc(v, w), index_without.get_spc(v, w));
        }
    }
    check_all_pairs(&with, &index_with);
}

#[test]
fn it_marks_own_label_slots_consistently() {
    // every uncontracted node's label holds distance zero exactly at its own
    // rank slot, so landmark positions agree across all nodes
    let mut g = grid(3, 3, |_, _| 2);
    let (ch, index) = build(&mut g);
    for &v in g.nodes() {
        if index.is_contracted(v) {
            continue;
        }
        let label = index.flat(index.get_contraction_label(v).cut_index);
        let rank = ch.rank(v) as usize;
        assert_eq!(label.distances()[rank], 0);
        assert_eq!(label.paths()[rank], 1);
        let zeros = label.distances().iter().filter(|&&d| d == 0).count();
        assert_eq!(zeros, 1, "node {} has {} zero slots", v, zeros);
    }
}

#[test]
fn it_round_trips_through_index_files() {
    let mut g = Graph::with_edges(
        5,
        &[Edge::new(1, 2, 1), Edge::new(2, 3, 1), Edge::new(3, 4, 1), Edge::new(4, 5, 1)],
    );
    let (ch, index) = build(&mut g);
    let before: Vec<(Weight, PathCount)> = g
        .nodes()
        .iter()
        .flat_map(|&v| g.nodes().iter().map(move |&w| (v, w)))
        .map(|(v, w)| (index.get_distance(v, w), index.get_spc(v, w)))
        .collect();

    let prefix = std::env::temp_dir().join(format!("road_labeling_{}", std::process::id()));
    let cl_path = format!("{}_cl", prefix.display());
    let gs_path = format!("{}_gs", prefix.display());
    {
        let mut ofs = std::io::BufWriter::new(std::fs::File::create(&cl_path).unwrap());
        index.write(&mut ofs).unwrap();
        let mut ofs = std::io::BufWriter::new(std::fs::File::create(&gs_path).unwrap());
        ch.write(&mut ofs).unwrap();
    }
    let mut ifs = std::io::BufReader::new(std::fs::File::open(&cl_path).unwrap());
    let reloaded = ContractionIndex::read(&mut ifs).unwrap();
    let mut ifs = std::io::BufReader::new(std::fs::File::open(&gs_path).unwrap());
    let ch_reloaded = ContractionHierarchy::read(&mut ifs).unwrap();
    std::fs::remove_file(&cl_path).unwrap();
    std::fs::remove_file(&gs_path).unwrap();

    let after: Vec<(Weight, PathCount)> = g
        .nodes()
        .iter()
        .flat_map(|&v| g.nodes().iter().map(move |&w| (v, w)))
        .map(|(v, w)| (reloaded.get_distance(v, w), reloaded.get_spc(v, w)))
        .collect();
    assert_eq!(before, after);
    assert_eq!(ch_reloaded.node_count(), ch.node_count());
    assert_eq!(ch_reloaded.edge_count(), ch.edge_count());
}

#[test]
fn it_maintains_queries_after_reload_and_update() {
    // write, reload, update the reloaded index and compare to ground truth
    let mut g = grid(3, 3, |_, _| 2);
    let (ch, index) = build(&mut g);

    let prefix = std::env::temp_dir().join(format!("road_labeling_upd_{}", std::process::id()));
    let cl_path = format!("{}_cl", prefix.display());
    let gs_path = format!("{}_gs", prefix.display());
    {
        let mut ofs = std::io::BufWriter::new(std::fs::File::create(&cl_path).unwrap());
        index.write(&mut ofs).unwrap();
        let mut ofs = std::io::BufWriter::new(std::fs::File::create(&gs_path).unwrap());
        ch.write(&mut ofs).unwrap();
    }
    let mut ifs = std::io::BufReader::new(std::fs::File::open(&cl_path).unwrap());
    let mut index = ContractionIndex::read(&mut ifs).unwrap();
    let mut ifs = std::io::BufReader::new(std::fs::File::open(&gs_path).unwrap());
    let mut ch = ContractionHierarchy::read(&mut ifs).unwrap();
    std::fs::remove_file(&cl_path).unwrap();
    std::fs::remove_file(&gs_path).unwrap();

    let updates = [((2, 1), (1, 2))];
    g.update_edge(1, 2, 1);
    g.update_edge(2, 1, 1);
    g.dcl_dec(&mut ch, &mut index, &updates);
    check_all_pairs(&g, &index);
}
