// src/main.rs
//! `lullaby-shader`: resolves one shader variant from a definition file and prints the
//! generated stage sources.
//!
//! ```text
//! lullaby-shader <shader.json> [--config render.json] [--model name] [--feature NAME]...
//! ```

use std::backtrace::Backtrace;
use std::panic;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::{error, info};

use lullaby_render::gpu::HeadlessGpuContext;
use lullaby_render::shaders::{generate_stage_source, select_shader_snippets, ShaderStageType};
use lullaby_render::{logging, RenderConfig, ShaderDef, ShaderFactory};

const USAGE: &str =
    "usage: lullaby-shader <shader.json> [--config render.json] [--model name] [--feature NAME]...";

#[derive(Debug, Default)]
struct Args {
    def_path: PathBuf,
    config_path: Option<PathBuf>,
    shading_model: Option<String>,
    features: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut def_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                parsed.config_path = Some(args.next().context("--config needs a path")?.into())
            }
            "--model" => parsed.shading_model = Some(args.next().context("--model needs a name")?),
            "--feature" => parsed.features.push(args.next().context("--feature needs a name")?),
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            path => {
                if def_path.replace(PathBuf::from(path)).is_some() {
                    bail!("only one shader definition can be given");
                }
            }
        }
    }
    parsed.def_path = def_path.context(USAGE)?;
    Ok(parsed)
}

fn main() {
    install_panic_hook();
    if let Err(err) = run() {
        error!("{:#}", err);
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config_path {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    logging::init(config.log_level());

    let def = ShaderDef::load(&args.def_path)?;
    let features: Vec<&str> = args.features.iter().map(String::as_str).collect();
    let params = config.selection_params(&features);
    let shading_model = args.shading_model.clone().unwrap_or_else(|| {
        args.def_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shader".to_string())
    });

    let selection = select_shader_snippets(&def, &params)?;
    info!("{}: shader version {}", shading_model, selection.shader_version);
    for stage in ShaderStageType::ALL {
        println!("// ---------- {} ----------", stage.name());
        let source = generate_stage_source(
            stage,
            selection.stage(stage),
            params.lang,
            selection.shader_version,
        );
        println!("{}", source);
    }

    let mut gpu = HeadlessGpuContext::new(config.max_texture_units);
    let factory = ShaderFactory::new(config.shader_cache_capacity);
    let shader = factory.load_shader(&shading_model, &def, &params, &mut gpu)?;
    let description = shader.description();
    info!(
        "compiled {} with {} uniforms, {} samplers, {} attributes",
        shading_model,
        description.uniforms.len(),
        description.samplers.len(),
        description.attributes.len()
    );
    Ok(())
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::capture();
        let msg = match panic_info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<dyn Any>",
            },
        };
        let location = panic_info
            .location()
            .map_or("unknown location".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        eprintln!("lullaby-shader panicked: {}\n  at {}\n{}", msg, location, backtrace);
    }));
}
