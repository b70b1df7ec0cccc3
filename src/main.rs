use cache_sim::cache::{Cache, CacheConfig};
use cache_sim::simulation::Simulation;

#[derive(Debug)]
struct Args {
    config: CacheConfig,
    trace_file: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut set_index_bits = None;
    let mut associativity = None;
    let mut block_offset_bits = None;
    let mut trace_file = None;

    while let Some(flag) = args.next() {
        let Some(value) = args.next() else {
            return Err(format!("missing value for '{flag}'"));
        };
        match flag.as_str() {
            "-s" => {
                set_index_bits =
                    Some(value.parse().map_err(|e| format!("invalid -s value: {e}"))?);
            }
            "-E" => {
                associativity =
                    Some(value.parse().map_err(|e| format!("invalid -E value: {e}"))?);
            }
            "-b" => {
                block_offset_bits =
                    Some(value.parse().map_err(|e| format!("invalid -b value: {e}"))?);
            }
            "-t" => trace_file = Some(value),
            _ => return Err(format!("unknown option '{flag}'")),
        }
    }

    Ok(Args {
        config: CacheConfig {
            set_index_bits: set_index_bits.ok_or("missing required option -s")?,
            associativity: associativity.ok_or("missing required option -E")?,
            block_offset_bits: block_offset_bits.ok_or("missing required option -b")?,
        },
        trace_file: trace_file.ok_or("missing required option -t")?,
    })
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            println!("{e}");
            println!("usage: cache_sim -s <set bits> -E <associativity> -b <block bits> -t <trace file>");
            std::process::exit(1);
        }
    };

    let mut cache = match Cache::new(args.config) {
        Ok(cache) => cache,
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    };

    match Simulation::run(&mut cache, &args.trace_file) {
        Ok(stats) => {
            if stats.skipped_lines > 0 {
                println!("skipped {} malformed trace lines", stats.skipped_lines);
            }
            println!("{}", stats.format_summary());
        }
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    }
}
