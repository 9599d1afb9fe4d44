//! End-to-end session flow: detect → ingest → configure → fetch → render.

use std::sync::Arc;

use xsplot::{
    classify, FetchStatus, FigureConfig, PlotSession, Quantity, RenderQuality, ScriptedService,
    SeriesConfig, SeriesId, SeriesParams, SeriesStyle, SourceKind, UploadedFile,
};

fn ace_sample() -> String {
    let mut content = String::from(" 1001.02c   1.00783 -1.12606  0\n");
    for _ in 0..6 {
        content.push_str("  1.234E-05  5.678E+03\n");
    }
    content
}

fn endf_sample() -> String {
    let mut content = String::new();
    for i in 0..40 {
        content.push_str(&format!(
            "{:<66}{:>4}{:>2}{:>3}{:>5}\n",
            " 1.001000+3 9.991673-1          0          0          0          5",
            9228,
            4,
            18,
            i + 1
        ));
    }
    content
}

#[tokio::test(start_paused = true)]
async fn full_session_flow() {
    let service = ScriptedService::auto();
    let session = PlotSession::new(Arc::new(service.clone()));
    let mut cache_events = session.subscribe_cache();
    let mut render_events = session.subscribe_renders();

    // Heuristic classification sorts the uploads.
    let ace = ace_sample();
    let endf = endf_sample();
    assert_eq!(classify("upload1", &ace), SourceKind::Ace);
    assert_eq!(classify("upload2", &endf), SourceKind::Endf);

    let ids = session
        .library()
        .ingest_with_detection(vec![
            UploadedFile {
                name: "1001.02c".into(),
                path: None,
                content: ace,
            },
            UploadedFile {
                name: "u235.endf".into(),
                path: None,
                content: endf,
            },
        ])
        .await;
    assert_eq!(session.library().query(SourceKind::Ace).len(), 1);
    assert_eq!(session.library().query(SourceKind::Endf).len(), 1);

    // Two overlapping series over different sources.
    let (s1, s2) = (SeriesId::new(), SeriesId::new());
    session.configure_series(SeriesConfig {
        id: s1,
        source: ids[0],
        params: SeriesParams {
            quantity: Quantity::CrossSection,
            reaction: 18,
            include_uncertainty: true,
            ..Default::default()
        },
        style: SeriesStyle {
            label: Some("H-1 (n,f)".into()),
            color: Some("#0077bb".into()),
            ..Default::default()
        },
    });
    session.configure_series(SeriesConfig {
        id: s2,
        source: ids[1],
        params: SeriesParams {
            quantity: Quantity::CrossSection,
            reaction: 102,
            ..Default::default()
        },
        style: SeriesStyle {
            label: Some("U-235 capture".into()),
            ..Default::default()
        },
    });

    let mut ready = std::collections::HashSet::new();
    while ready.len() < 2 {
        let event = cache_events.recv().await.expect("cache events");
        if event.status == FetchStatus::Ready {
            ready.insert(event.series);
        }
    }

    let e1 = session.snapshot(s1);
    let e2 = session.snapshot(s2);
    assert!(e1.is_ready() && e2.is_ready());
    assert_ne!(e1.signature, e2.signature);
    assert!(e1.payload.as_ref().expect("payload").uncertainty.is_some());
    assert!(e2.payload.as_ref().expect("payload").uncertainty.is_none());

    // One debounced render over both resolved series.
    session.request_render(
        FigureConfig {
            title: "H-1 vs U-235".into(),
            ..Default::default()
        },
        RenderQuality::High,
    );
    let render = render_events.recv().await.expect("render event");
    assert!(render.error.is_none());

    let call = &service.render_log()[0];
    assert_eq!(call.labels.len(), 2);
    assert!(call.labels.contains(&"H-1 (n,f)".to_string()));
    assert!(call.labels.contains(&"U-235 capture".to_string()));
    assert_eq!(
        session.last_render().expect("image").dpi,
        300,
        "high quality renders at 300 dpi"
    );

    assert_eq!(service.compute_calls(), 2);
    assert_eq!(service.render_calls(), 1);
}
