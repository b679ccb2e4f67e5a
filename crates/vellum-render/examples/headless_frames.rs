//! Headless demo -- simulate a small scene and save every Nth frame as PNG.
//!
//! Run with:
//!   cargo run --example headless_frames -p vellum-render -- [out_dir] [frames]
//!
//! Set `RUST_LOG=vellum_render=debug` to see texture and background logs.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vellum_render::prelude::*;
use vellum_scene::prelude::*;

/// Save one frame out of this many.
const SAVE_EVERY: u64 = 30;

fn build_world() -> anyhow::Result<PhysicsWorld> {
    let mut physics = PhysicsWorld::new(0.0, 9.81);

    physics.add_body(
        BodyDesc::new(
            Vector::new(0.0, 6.0),
            vec![box_part(16.0, 0.5).with_render(PartRender::filled("#2e3440"))],
        )
        .with_type(PhysicsBodyType::Static)
        .with_label("floor"),
    )?;

    for i in 0..5 {
        let x = -4.0 + i as f64 * 2.0;
        // world units are meters, so borders are a few centimeters wide
        let style = PartRender {
            line_width: 0.05,
            stroke_style: "#eceff4".to_owned(),
            ..PartRender::filled("#5e81ac")
        };
        physics.add_body(
            BodyDesc::new(Vector::new(x, -2.0 - i as f64), vec![box_part(1.0, 1.0).with_render(style)])
                .with_label(format!("box {i}")),
        )?;
    }

    physics.add_body(BodyDesc::new(
        Vector::new(0.5, -8.0),
        vec![
            box_part(2.0, 0.5).with_render(PartRender::filled("#bf616a")),
            box_part(0.5, 2.0)
                .at(Vector::new(0.0, 1.25))
                .with_render(PartRender::filled("#bf616a")),
        ],
    ))?;

    let ball = physics.add_body(BodyDesc::new(
        Vector::new(5.0, -4.0),
        vec![circle_part(0.6).with_render(PartRender::filled("#a3be8c"))],
    ))?;
    physics.add_constraint(ConstraintDesc {
        body_a: ball,
        body_b: None,
        point_a: Vector::ZERO,
        point_b: Vector::new(5.0, -7.0),
        stiffness: 40.0,
        damping: 0.5,
        render: ConstraintRender {
            kind: ConstraintKind::Spring,
            line_width: 0.05,
            stroke_style: "#ebcb8b".to_owned(),
            anchors: false,
            ..ConstraintRender::default()
        },
    })?;

    Ok(physics)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "frames".to_owned()));
    let frames: u64 = match args.next() {
        Some(n) => n.parse().with_context(|| format!("frame count '{n}' is not a number"))?,
        None => 180,
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let physics = build_world()?;
    let options = RenderOptions::from_json_str(
        r##"{
            "wireframes": false,
            "background": "#1d2128"
        }"##,
    )?;
    let mut render = Render::new(options)?;

    let initial = physics.snapshot();
    let bodies = initial.world.all_bodies();
    render.look_at(&bodies, Vector::new(1.0, 1.0), true);

    let mut runner = HeadlessRunner::new(physics, render, RunnerConfig::default());
    let (width, height) = runner.render().canvas_size();
    let mut surface = RasterSurface::new(width as u32, height as u32)?;

    for _ in 0..frames {
        let report = runner.frame(&mut surface);
        if report.frame % SAVE_EVERY == 0 {
            let path = out_dir.join(format!("frame_{:04}.png", report.frame));
            surface.save_png(&path)?;
            info!(frame = report.frame, path = %path.display(), "saved");
        }
    }

    let timing = runner.render().timing();
    info!(
        frames = timing.frames(),
        average_us = timing.average().as_micros() as u64,
        "done"
    );
    Ok(())
}
