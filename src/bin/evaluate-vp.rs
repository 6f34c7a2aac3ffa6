use std::env;
use std::time::Instant;

use axon::*;

fn build_predictor() -> EqualityPredictor {
    let mut cfg = EqConfig::new();
    cfg.add_component(EqComponentConfig {
        size: 2048,
        ghist_bits: 0,
        index_bits: 11,
        tag_bits: 0,
    });
    for ghist_bits in [2, 4, 8, 16, 32, 64, 128] {
        cfg.add_component(EqComponentConfig {
            size: 512,
            ghist_bits,
            index_bits: 9,
            tag_bits: 12,
        });
    }
    cfg.build()
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: {} <trace file>", args[0]);
        return;
    }

    let trace = TextTrace::from_file(&args[1]);
    println!("[*] Loaded {} records from {}", trace.num_records(), args[1]);

    let mut ep = build_predictor();
    println!("[*] Equality predictor configuration:");
    println!("      Entries (in total): {}", ep.cfg.total_entries());
    for (idx, comp) in ep.cfg.comp.iter().enumerate() {
        println!(
            "        {} entries (component {}, {} history bits, {} tag bits)",
            comp.size, idx, comp.ghist_bits, comp.tag_bits,
        );
    }
    let storage_bits = ep.cfg.storage_bits();
    let storage_kib = storage_bits as f64 / 1024.0 / 8.0;
    println!("      Storage bits: {}b, {:.2}KiB", storage_bits, storage_kib);

    let mut stats = EvalStats::new();
    let start = Instant::now();
    for record in trace.as_slice() {
        // A single rolling sequence number: every branch is announced
        // speculatively and retired immediately.
        let (_, prediction) = ep.predict(record.pc);
        stats.update(record.pc, prediction == record.taken);

        ep.on_value_commit(record.pc, record.taken);
        ep.update_on_branch(0, record.taken);
        ep.on_branch_commit(0);

        if stats.global_count % 100_000 == 0 {
            println!(
                "[*] Processed {} records ({:.4} accuracy, {:.2} MPKI)",
                stats.global_count,
                stats.hit_rate(),
                stats.mpki(),
            );
        }
    }
    let done = start.elapsed();
    println!("[*] ... simulated in {:.3?}", done);
    println!();

    println!("[*] Global statistics:");
    println!("      Unique program counters: {}", stats.num_unique_pcs());
    println!(
        "      Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        stats.global_hits,
        stats.global_count,
        stats.hit_rate() * 100.0,
        stats.global_miss(),
    );
    println!("      MPKI: {:.2} miss/krecord", stats.mpki());
    println!();

    println!("[*] Predictor statistics:");
    println!("      {} commits, {} squashes", ep.stat.commits, ep.stat.squashes);
    println!(
        "      {} allocations, {} failed, {} conflict decays",
        ep.stat.allocs, ep.stat.failed_allocs, ep.stat.conflict_decays,
    );
    for (idx, comp) in ep.comp.iter().enumerate() {
        println!(
            "      Component[{:1}]: {:9} hits, {:6.2}% utilization",
            idx, ep.stat.comp_hits[idx], comp.utilization(),
        );
    }

    println!();
    println!("[*] Low hit-rate program counters:");
    for (pc, data) in stats.get_low_rate_pcs(8) {
        println!(
            "      {:016x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate(),
        );
    }
}
