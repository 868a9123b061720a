use clap::{value_parser, Arg, ArgAction, Command, ValueEnum};
use csv::Writer;
use rand::distributions::{Uniform, WeightedIndex};
use std::fmt;
use std::fs::{create_dir_all, File, OpenOptions};
use std::path::Path;
use std::time::Duration;

#[derive(PartialEq, Debug, ValueEnum, Clone)]
pub enum DS {
    #[value(name = "hjbst")]
    HJBSTree,
    #[value(name = "efrbtree")]
    EFRBTree,
}

#[derive(PartialEq, Debug)]
pub enum Op {
    Contains,
    Add,
    Remove,
}

impl Op {
    pub const OPS: [Op; 3] = [Op::Contains, Op::Add, Op::Remove];
}

#[derive(Clone, Copy, PartialEq)]
pub enum GetRate {
    WriteOnly = 0,
    ReadWrite = 1,
    ReadIntensive = 2,
    ReadOnly = 3,
}

pub struct Config {
    pub ds: DS,
    pub threads: usize,

    pub get_rate: GetRate,
    pub op_dist: WeightedIndex<i32>,
    pub key_dist: Uniform<usize>,
    pub prefill: usize,
    pub key_range: usize,
    pub interval: u64,
    pub duration: Duration,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} threads, g{}, r{}",
            self.ds_name(),
            self.threads,
            self.get_rate as u8,
            self.key_range,
        )
    }
}

impl Config {
    fn ds_name(&self) -> String {
        self.ds
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }
}

pub struct BenchWriter {
    output: Option<Writer<File>>,
}

#[derive(Clone)]
pub struct Perf {
    pub ops_per_sec: u64,
}

impl fmt::Display for Perf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ops/s: {}", self.ops_per_sec)
    }
}

impl BenchWriter {
    pub fn write_record(self, config: &Config, perf: &Perf) -> csv::Result<()> {
        if let Some(mut output) = self.output {
            output.write_record(&[
                config.ds_name(),
                config.threads.to_string(),
                (config.get_rate as u8).to_string(),
                perf.ops_per_sec.to_string(),
                config.key_range.to_string(),
                config.interval.to_string(),
            ])?;
            output.flush()?;
        }
        Ok(())
    }
}

fn open_output(output_name: &str) -> csv::Result<Writer<File>> {
    let output_path = Path::new(output_name);
    if let Some(dir) = output_path.parent() {
        create_dir_all(dir)?;
    }
    match OpenOptions::new().read(true).append(true).open(output_path) {
        Ok(f) => Ok(csv::Writer::from_writer(f)),
        Err(_) => {
            let f = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(output_path)?;
            let mut output = csv::Writer::from_writer(f);
            // NOTE: `write_record` on `bench`
            output.write_record([
                "ds",
                "threads",
                "get_rate",
                "throughput",
                "key_range",
                "interval",
            ])?;
            output.flush()?;
            Ok(output)
        }
    }
}

pub fn setup() -> (Config, BenchWriter) {
    let m = Command::new("nbbst")
        .arg(
            Arg::new("data structure")
                .short('d')
                .value_parser(value_parser!(DS))
                .required(true)
                .ignore_case(true)
                .help("Data structure(s)"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .value_parser(value_parser!(usize))
                .required(true)
                .help("Numbers of threads to run."),
        )
        .arg(
            Arg::new("get rate")
                .short('g')
                .help(
                    "The proportion of `contains`(read) operations. \
                     0: 0%, 1: 50%, 2: 90%, 3: 100%",
                )
                .value_parser(value_parser!(u8).range(0..4))
                .default_value("0"),
        )
        .arg(
            Arg::new("range")
                .short('r')
                .value_parser(value_parser!(usize))
                .help("Key range: [0..RANGE]")
                .default_value("100000"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .value_parser(value_parser!(u64))
                .help("Time interval in seconds to run the benchmark")
                .default_value("10"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .help("Output CSV filename. Appends the data if the file already exists."),
        )
        .arg(
            Arg::new("dry run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Check whether the arguments are parsable, without running a benchmark"),
        )
        .get_matches();

    let ds = m
        .get_one::<DS>("data structure")
        .cloned()
        .expect("required by clap");
    let threads = m.get_one::<usize>("threads").copied().expect("required by clap");
    let get_rate = match m.get_one::<u8>("get rate").copied().unwrap_or(0) {
        0 => GetRate::WriteOnly,
        1 => GetRate::ReadWrite,
        2 => GetRate::ReadIntensive,
        3 => GetRate::ReadOnly,
        _ => unreachable!("get_rate is invalid"),
    };
    let key_range = m.get_one::<usize>("range").copied().unwrap_or(100000).max(1);
    let prefill = key_range / 2;
    let key_dist = Uniform::from(0..key_range);
    let interval = m.get_one::<u64>("interval").copied().unwrap_or(10);
    let duration = Duration::from_secs(interval);

    // Weights follow `Op::OPS`: contains, add, remove.
    let op_weights = match get_rate {
        GetRate::WriteOnly => &[0, 1, 1],
        GetRate::ReadWrite => &[2, 1, 1],
        GetRate::ReadIntensive => &[18, 1, 1],
        GetRate::ReadOnly => &[1, 0, 0],
    };
    let op_dist = WeightedIndex::new(op_weights).expect("weights are constant and non-zero");

    let output = m.get_one::<String>("output").map(|output_name| {
        open_output(output_name)
            .unwrap_or_else(|e| panic!("cannot open output file {output_name}: {e}"))
    });
    let config = Config {
        ds,
        threads,
        get_rate,
        op_dist,
        key_dist,
        prefill,
        key_range,
        interval,
        duration,
    };

    if m.get_flag("dry run") {
        std::process::exit(0);
    }

    (config, BenchWriter { output })
}
