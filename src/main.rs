use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use xsplot::{
    FetchStatus, FigureConfig, PlotSession, Quantity, RenderQuality, ScriptedService,
    SeriesConfig, SeriesId, SeriesParams, SeriesStyle, SourceKind, UploadedFile,
};

const SAMPLE_ACE: &str = concat!(
    " 1001.02c   1.00783 -1.12606  0\n",
    "  1.00000E-05  2.04363E+01\n",
    "  1.00000E-03  2.04287E+01\n",
    "  1.00000E-01  2.02351E+01\n",
    "  1.00000E+01  1.95201E+01\n",
    "  1.00000E+03  1.62345E+01\n",
    "  1.00000E+05  9.12345E+00\n",
);

/// End-to-end demo against the scripted in-memory service: ingest a sample
/// table, configure a fission cross-section series, wait for the cache to
/// fill, and request a rendered figure.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = PlotSession::new(Arc::new(ScriptedService::auto()));
    let mut cache_events = session.subscribe_cache();
    let mut render_events = session.subscribe_renders();

    let ids = session
        .library()
        .ingest(
            vec![UploadedFile {
                name: "1001.02c".into(),
                path: None,
                content: SAMPLE_ACE.into(),
            }],
            Some(SourceKind::Ace),
        )
        .await;

    let series = SeriesId::new();
    session.configure_series(SeriesConfig {
        id: series,
        source: ids[0],
        params: SeriesParams {
            quantity: Quantity::CrossSection,
            reaction: 18,
            ..Default::default()
        },
        style: SeriesStyle {
            label: Some("H-1 fission".into()),
            ..Default::default()
        },
    });

    loop {
        let event = cache_events.recv().await?;
        if event.series == series && event.status == FetchStatus::Ready {
            break;
        }
    }
    let entry = session.snapshot(series);
    let data = entry
        .payload
        .ok_or_else(|| anyhow::anyhow!("ready entry missing payload"))?;
    let signature = entry
        .signature
        .ok_or_else(|| anyhow::anyhow!("ready entry missing signature"))?;
    println!("series ready: {} points, signature {signature}", data.len());

    session.request_render(FigureConfig::default(), RenderQuality::High);
    let render = render_events.recv().await?;
    match render.error {
        None => {
            let image = session
                .last_render()
                .ok_or_else(|| anyhow::anyhow!("render committed without an image"))?;
            println!(
                "figure rendered: {}x{} at {} dpi",
                image.width, image.height, image.dpi
            );
        }
        Some(error) => println!("render failed: {error}"),
    }

    Ok(())
}
