use std::{env, error::Error, fs::File, io::BufReader, io::BufWriter};

use road_labeling::{
    algo::{flat_index::ContractionIndex, hierarchy::ContractionHierarchy, LabelingConfig},
    cli::UsageErr,
    graph::store::read_graph,
    report::benchmark::{report_time, Timer},
};

const MB: usize = 1024 * 1024;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();
    args.next();
    let graph_path = args.next().ok_or(UsageErr::INDEX)?;
    let index_prefix = args.next().ok_or(UsageErr::INDEX)?;

    let input = BufReader::new(File::open(graph_path)?);
    let mut g = report_time("reading graph", || read_graph(input))?;

    let timer = Timer::new();
    // degree 1 node contraction
    let closest = g.contract();

    // construct index
    let mut ci = g.create_cut_index(LabelingConfig::default());
    g.reset();

    let ch = ContractionHierarchy::build(&g, &mut ci, &closest);
    let con_index = ContractionIndex::new(ci, &closest);

    println!("created index of size {} MB in {}s", con_index.size() / MB, timer.get_passed_s());

    // write index
    let mut ofs = BufWriter::new(File::create(format!("{}_cl", index_prefix))?);
    con_index.write(&mut ofs)?;
    let mut ofs = BufWriter::new(File::create(format!("{}_gs", index_prefix))?);
    ch.write(&mut ofs)?;

    Ok(())
}
