pub mod cli;
pub mod config;
pub mod filter;
pub mod render;
pub mod session;
pub mod source;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting todo CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.todorc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_file =
    config::resolve_data_file(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve task file"
    )?;

  let mut store =
    store::TodoStore::with_filter(
      cfg.filter_mode()?
    );
  let task_source =
    source::FileSource::new(&data_file);
  store.seed(source::fetch_once(
    &task_source
  ));

  let renderer =
    render::Renderer::new(&cfg)?;
  let mut session =
    session::Session::new(
      store, renderer
    );

  let tokens: Vec<String> = cli
    .rest
    .into_iter()
    .map(|arg| {
      arg.to_string_lossy().to_string()
    })
    .collect();

  if tokens.is_empty() {
    let stdin = io::stdin();
    session.run_interactive(
      stdin.lock(),
      io::stdout().lock()
    )?;
  } else {
    let command =
      session::Command::parse(&tokens)?;
    session.execute(
      command,
      io::stdout().lock()
    )?;
  }

  info!("done");
  Ok(())
}
