#[macro_use] extern crate clap;


use clap::{App, ArgMatches};
use env_logger::{from_env, Env};
use jailfs::{HostFilesystem, JailError, JailFilesystem, ResolveOptions, Stat};
use std::{io, process};

type Jail = JailFilesystem<HostFilesystem>;

#[tokio::main]
async fn main() {
    let yaml = load_yaml!("cli.yml");
    let matches = App::from_yaml(yaml).get_matches();

    let log_level = matches.value_of("log_level").unwrap();
    from_env(Env::default().default_filter_or(log_level)).init();

    let mut jail = match open_jail(&matches) {
        Ok(jail) => jail,
        Err(err) => {
            log::error!("{}", err);
            process::exit(2);
        }
    };

    let result = match matches.subcommand() {
        ("resolve", Some(sub)) => resolve(&jail, sub).await,
        ("real", Some(sub)) => real(&jail, sub).await,
        ("type", Some(sub)) => entity_type(&jail, sub).await,
        ("stat", Some(sub)) => stat(&jail, sub).await,
        ("identical", Some(sub)) => identical(&jail, sub).await,
        ("tempdir", Some(_)) => jail.system_temp_directory_async().await,
        (other, _) => Err(JailError::InvalidArgument(format!(
            "unknown subcommand {:?}",
            other
        ))),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    }
}

fn open_jail(matches: &ArgMatches) -> Result<Jail, JailError> {
    let root = match matches.value_of("root") {
        Some(root) => root.to_string(),
        None => jailfs::default_root()?,
    };
    let root = HostFilesystem::canonical_root(&root)?;
    let mut builder = JailFilesystem::builder(HostFilesystem::new()).root(&root);
    if let Some(cwd) = matches.value_of("cwd") {
        builder = builder.current_dir(cwd);
    }
    builder.build()
}

fn follow_links(matches: &ArgMatches) -> bool {
    !matches.is_present("no_follow")
}

async fn resolve(jail: &Jail, matches: &ArgMatches<'_>) -> Result<String, JailError> {
    let options = ResolveOptions::new()
        .follow_links(follow_links(matches))
        .not_found(matches.value_of("policy").unwrap().parse()?);
    jail.resolve_async(matches.value_of("path").unwrap(), options)
        .await
}

async fn real(jail: &Jail, matches: &ArgMatches<'_>) -> Result<String, JailError> {
    let options = ResolveOptions::new().follow_links(follow_links(matches));
    let local = jail
        .resolve_async(matches.value_of("path").unwrap(), options)
        .await?;
    jail.to_real(&local, false, false)
}

async fn entity_type(jail: &Jail, matches: &ArgMatches<'_>) -> Result<String, JailError> {
    let path = matches.value_of("path").unwrap();
    Ok(jail
        .entity_type_async(path, follow_links(matches))
        .await?
        .to_string())
}

async fn stat(jail: &Jail, matches: &ArgMatches<'_>) -> Result<String, JailError> {
    let stat = jail.stat_async(matches.value_of("path").unwrap()).await?;
    if matches.is_present("json") {
        stat_json(&stat)
    } else {
        Ok(stat_text(&stat))
    }
}

fn stat_json(stat: &Stat) -> Result<String, JailError> {
    serde_json::to_string_pretty(stat)
        .map_err(|err| JailError::Io(io::Error::new(io::ErrorKind::Other, err)))
}

fn stat_text(stat: &Stat) -> String {
    format!(
        "type: {}\nmode: {} ({:o})\nsize: {}\nmodified: {:?}\naccessed: {:?}\nchanged: {:?}",
        stat.entity_type,
        stat.mode_string(),
        stat.mode,
        stat.size,
        stat.modified,
        stat.accessed,
        stat.changed
    )
}

async fn identical(jail: &Jail, matches: &ArgMatches<'_>) -> Result<String, JailError> {
    let a = matches.value_of("a").unwrap();
    let b = matches.value_of("b").unwrap();
    Ok(jail.identical_async(a, b).await?.to_string())
}
