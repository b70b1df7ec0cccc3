pub mod cache;
pub mod simulation;
pub mod trace;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn run_simulation(
    set_index_bits: u32,
    associativity: u32,
    block_offset_bits: u32,
    trace: &str,
) -> String {
    use cache::{Cache, CacheConfig};
    use simulation::Simulation;

    let mut cache = match Cache::new(CacheConfig {
        set_index_bits,
        associativity: associativity as usize,
        block_offset_bits,
    }) {
        Ok(cache) => cache,
        Err(e) => return e.to_string(),
    };

    let stats = Simulation::simulate(&mut cache, trace);

    let mut result = Vec::new();
    result.push(cache.format_info());
    if stats.skipped_lines > 0 {
        result.push(format!("skipped {} malformed trace lines", stats.skipped_lines));
    }
    result.push(stats.format_summary());

    result.join("\n")
}
