extern crate docopt;
#[macro_use]
extern crate serde_derive;

use std::process;

use docopt::Docopt;
use prodcon::bounded;
use prodcon::bench::BOUNDED_SLOTS;
use prodcon::{bench_queue, unbounded, Token};

const VERSION: &str = "0.1.0";

const USAGE: &str = "
Producer consumer queue benchmark.

Usage:
  bench [-n <items>] [-s <spin>] [-q <queue>] [--backoff] [--no-work] [--pin]
  bench (-h | --help)
  bench (-v | --version)

Options:
  -h --help         Show this screen.
  -v --version      Show version.
  -n <items>        number of items to push [default: 300000000].
  -s <spin>         busy wait iterations for backoff and work [default: 30].
  -q <queue>        queue to run: all, bounded or unbounded [default: all].
  --backoff         spin after a failed push or an empty pop.
  --no-work         don't spin after each transferred item.
  --pin             pin producer and consumer to two distinct cores.
";

#[derive(Debug, Deserialize)]
struct Args {
    flag_n: usize,
    flag_s: usize,
    flag_q: String,
    flag_backoff: bool,
    flag_no_work: bool,
    flag_pin: bool,
    flag_v: bool,
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if args.flag_v {
        return println!("bench: {}", VERSION);
    }

    prodcon::config()
        .set_items(args.flag_n)
        .set_spin(args.flag_s)
        .set_backoff(args.flag_backoff)
        .set_work(!args.flag_no_work)
        .set_pin_threads(args.flag_pin);

    let (run_unbounded, run_bounded) = match args.flag_q.as_str() {
        "all" => (true, true),
        "bounded" => (false, true),
        "unbounded" => (true, false),
        other => {
            eprintln!("unknown queue `{}`\n{}", other, USAGE);
            process::exit(2);
        }
    };

    let mut reports = Vec::new();
    if run_unbounded {
        reports.push(bench_queue::<unbounded::Queue<Token>>("Unbounded Queue"));
    }
    if run_bounded {
        reports.push(bench_queue::<bounded::Queue<Token, BOUNDED_SLOTS>>(
            "Bounded Queue",
        ));
    }

    for report in reports {
        match report {
            Ok(report) => println!("{}", report),
            Err(e) => {
                eprintln!("benchmark failed: {}", e);
                process::exit(1);
            }
        }
    }
}
