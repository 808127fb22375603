use std::{
    env,
    error::Error,
    fs::File,
    io::{BufRead, BufReader},
};

use road_labeling::{algo::flat_index::ContractionIndex, cli::UsageErr, graph::NodeId, report::benchmark::Timer};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();
    args.next();
    let index_prefix = args.next().ok_or(UsageErr::QUERY)?;
    let query_path = args.next().ok_or(UsageErr::QUERY)?;

    let mut ifs = BufReader::new(File::open(format!("{}_cl", index_prefix))?);
    let con_index = ContractionIndex::read(&mut ifs)?;

    let mut queries: Vec<(NodeId, NodeId)> = Vec::new();
    for line in BufReader::new(File::open(query_path)?).lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let (Some(a), Some(b)) = (parts.next(), parts.next()) {
            queries.push((a.parse()?, b.parse()?));
        }
    }

    let timer = Timer::new();
    for &(a, b) in &queries {
        std::hint::black_box(con_index.get_spc(a, b));
    }
    println!("ran {} random queries in {}s", queries.len(), timer.get_passed_s());

    Ok(())
}
