use anyhow::{Context, Result};
use cavern_base::ensure_positive;
use cavern_model::Survey;
use cavern_view::gfx::hints::{HintStore, JsonHints, MemoryHints};
use cavern_view::gfx::probe;
use cavern_view::{
    DisplayOptions, Projection, Renderer, SoftwareDevice, StereoMode, ViewControl, Viewport,
};
use std::path::Path;
use tracing::info;

use crate::cli::{ProbeArgs, RenderArgs, StereoArg};

pub fn render(args: RenderArgs) -> Result<()> {
    let survey = Survey::load(&args.input)
        .with_context(|| format!("failed to load survey {}", args.input.display()))?;
    let mut options = match &args.options {
        Some(path) => DisplayOptions::load(path)?,
        None => DisplayOptions::default(),
    };
    options.names |= args.names;

    let device = SoftwareDevice::new(args.width, args.height);
    let mut renderer = Renderer::new(device, hint_store(args.hints.as_deref())?, &survey, options);
    renderer.resize(args.width, args.height);
    if args.perspective {
        renderer.set_projection(Projection::Perspective);
    }
    renderer.set_stereo(match args.stereo {
        StereoArg::Mono => StereoMode::Mono,
        StereoArg::Split => StereoMode::Split,
        StereoArg::Anaglyph => StereoMode::Anaglyph,
    });
    if let Some(scale) = args.scale {
        ensure_positive("scale", scale)?;
        renderer.set_scale(scale);
    }
    if let Some(pan) = args.pan {
        renderer.set_pan(pan.to_radians());
    }
    if let Some(tilt) = args.tilt {
        renderer.set_tilt(tilt.to_radians());
    }

    renderer.draw_frame();
    let image = renderer.screenshot().context("failed to read back the frame")?;
    image
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(path = %args.out.display(), "frame written");
    Ok(())
}

pub fn probe(args: ProbeArgs) -> Result<()> {
    let mut device = SoftwareDevice::new(64, 64).with_max_point_size(args.max_point_size);
    if args.broken_sprites {
        device = device.with_broken_sprites();
    }
    let mut hints = hint_store(args.hints.as_deref())?;
    let caps = probe::probe(&mut device, Viewport::new(64, 64), hints.as_mut());
    println!("blob:  {:?}", caps.blob);
    println!("cross: {:?}", caps.cross);
    println!("double buffered: {}", caps.double_buffered);
    Ok(())
}

fn hint_store(path: Option<&Path>) -> Result<Box<dyn HintStore>> {
    Ok(match path {
        Some(path) => Box::new(
            JsonHints::open(path).with_context(|| format!("failed to open hints {}", path.display()))?,
        ),
        None => Box::new(MemoryHints::new()),
    })
}
