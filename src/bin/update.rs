use std::{
    env,
    error::Error,
    fs::File,
    io::{BufRead, BufReader},
};

use road_labeling::{
    algo::{
        flat_index::ContractionIndex,
        hierarchy::ContractionHierarchy,
        maintenance::{ContractedUpdate, WeightUpdate},
    },
    cli::UsageErr,
    graph::{store::read_graph, NodeId, Weight},
    report::benchmark::Timer,
};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();
    args.next();
    let graph_path = args.next().ok_or(UsageErr::UPDATE)?;
    let index_prefix = args.next().ok_or(UsageErr::UPDATE)?;
    let update_path = args.next().ok_or(UsageErr::UPDATE)?;
    let direction = args.next().ok_or(UsageErr::UPDATE)?;
    let decrease = match direction.as_str() {
        "d" => true,
        "i" => false,
        _ => return Err(Box::new(UsageErr::UPDATE)),
    };

    let mut g = read_graph(BufReader::new(File::open(graph_path)?))?;

    let mut ifs = BufReader::new(File::open(format!("{}_cl", index_prefix))?);
    let mut con_index = ContractionIndex::read(&mut ifs)?;
    let mut ifs = BufReader::new(File::open(format!("{}_gs", index_prefix))?);
    let mut ch = ContractionHierarchy::read(&mut ifs)?;

    let mut contracted_updates: Vec<ContractedUpdate> = Vec::new();
    let mut updates: Vec<WeightUpdate> = Vec::new();

    for line in BufReader::new(File::open(update_path)?).lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let (a, b, weight): (NodeId, NodeId, Weight) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(w)) => (a.parse()?, b.parse()?, w.parse()?),
            _ => continue,
        };
        // deterministic new weight, truncated to integer
        let new_weight = if decrease { weight / 2 } else { weight + weight / 2 };

        g.update_edge(a, b, new_weight);
        g.update_edge(b, a, new_weight);

        let x = con_index.get_contraction_label(a);
        let y = con_index.get_contraction_label(b);
        if con_index.is_contracted(a) || con_index.is_contracted(b) {
            // descend the pendant side
            if x.distance_offset > y.distance_offset {
                contracted_updates.push(((x.distance_offset, y.distance_offset + new_weight), a));
            } else if x.distance_offset < y.distance_offset {
                contracted_updates.push(((y.distance_offset, x.distance_offset + new_weight), b));
            }
            continue;
        }
        updates.push(((weight, new_weight), (a, b)));
    }

    let timer = Timer::new();
    if decrease {
        g.dcl_dec(&mut ch, &mut con_index, &updates);
    } else {
        g.dcl_inc(&mut ch, &mut con_index, &updates);
    }
    g.contract_seq(&mut con_index, &mut contracted_updates);

    println!("ran {} random updates in {}", updates.len(), timer.get_passed_s());

    Ok(())
}
