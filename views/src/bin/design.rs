use atomicwrites::{AllowOverwrite, AtomicFile};
use log::{info, trace};
use std::io::Write;
use std::path::PathBuf;

use election_views::app::election::{IdView, SentimentView};
use election_views::design::DesignDocument;
use election_views::reduce::Reducer;
use election_views::Keywords;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "design", version = env!("CARGO_PKG_VERSION"), about = "Print the design document holding the election views", author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Design document name, without the _design/ prefix
    #[structopt(long, default_value = "tweets")]
    name: String,

    /// Keyword to match, may be repeated
    #[structopt(long = "keyword")]
    keywords: Vec<String>,

    /// JavaScript regex literal to match, e.g. /scott ?morrison/i, may be repeated
    #[structopt(long = "pattern")]
    patterns: Vec<String>,

    /// Reduce function attached to the sentiment view
    #[structopt(long, default_value = "_stats")]
    reduce: Reducer,

    /// Leave the sentiment view without a reduce function
    #[structopt(long)]
    no_reduce: bool,

    #[structopt(long)]
    keep_zero_compound: bool,

    /// Write here instead of stdout
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let keywords = Keywords::from_args(&opt.keywords, &opt.patterns)?;

    let sentiment = SentimentView::new(keywords.clone()).keep_zero_compound(opt.keep_zero_compound);
    let reduce = if opt.no_reduce { None } else { Some(opt.reduce) };
    let mut design = DesignDocument::new(&opt.name);
    design
        .add_view("election_sentiment", &sentiment, reduce)
        .add_view("election_ids", &IdView::new(keywords), None);
    info!("{} with {} views", design.id, design.views.len());

    let body = design.to_json()?;
    match opt.output {
        Some(path) => {
            let af = AtomicFile::new(&path, AllowOverwrite);
            af.write(|f| f.write_all(body.as_bytes()))
                .map_err(|e| anyhow::anyhow!("Error on writing {:?}: {}", path, e))?;
            trace!("output {:?}", path);
        }
        None => println!("{}", body),
    }
    Ok(())
}
