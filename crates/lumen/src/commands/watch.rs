//! `lumen watch`: follow the update stream until Ctrl-C.

use std::io::{self, IsTerminal, Write};

use chrono::Local;
use futures_util::StreamExt;
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;

use lumen_core::{Controller, ControllerConfig, LightSnapshot, StreamEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::lights::render_lights;

pub async fn handle(
    mut config: ControllerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.stream_enabled = true;
    if args.no_reconnect {
        config.reconnect_on_abnormal_close = false;
    }
    let reconnect = config.reconnect_on_abnormal_close;
    let color = output::should_color(&global.color);

    let controller = Controller::new(config);
    let mut events = controller.stream_events();
    controller.connect().await?;

    // Yields the current snapshot first, then one per registry change.
    let mut lights = controller.lights().into_stream();

    let mut events_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
            snap = lights.next() => match snap {
                Some(snap) => render(&snap, global),
                None => break,
            },
            event = events.recv(), if events_open => match event {
                Ok(event) => {
                    if args.events {
                        eprintln!("{}", describe(&event, color));
                    }
                    if stream_finished(&event, reconnect) {
                        if !global.quiet {
                            eprintln!("update stream closed; exiting");
                        }
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event display lagged"),
                Err(RecvError::Closed) => events_open = false,
            },
        }
    }

    controller.disconnect().await;
    Ok(())
}

/// The stream will not come back on its own.
fn stream_finished(event: &StreamEvent, reconnect: bool) -> bool {
    matches!(event, StreamEvent::Closed { normal, .. } if *normal || !reconnect)
}

fn render(snap: &LightSnapshot, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    let body = render_lights(snap, global);
    let mut stdout = io::stdout().lock();
    // Redraw in place for interactive tables; stream everything else.
    if matches!(global.output, OutputFormat::Table) && stdout.is_terminal() {
        let _ = write!(stdout, "\x1b[2J\x1b[H");
        let _ = writeln!(stdout, "{}  ({} lights)", Local::now().format("%H:%M:%S"), snap.len());
    }
    let _ = writeln!(stdout, "{body}");
    let _ = stdout.flush();
}

fn describe(event: &StreamEvent, color: bool) -> String {
    let text = match event {
        StreamEvent::Opened { url } => format!("stream open: {url}"),
        StreamEvent::Closed {
            code,
            reason,
            normal,
        } => {
            let kind = if *normal { "closed" } else { "lost" };
            format!("stream {kind} (code {code}): {reason}")
        }
        StreamEvent::Error { message } => format!("stream error: {message}"),
        StreamEvent::Message(update) => format!(
            "update {}/{}: on={:?} bri={:?}",
            update.group_id,
            update.light_id,
            update.state_request.on,
            update.state_request.bri
        ),
    };
    if !color {
        return text;
    }
    match event {
        StreamEvent::Opened { .. } => text.green().to_string(),
        StreamEvent::Closed { normal: true, .. } | StreamEvent::Message(_) => {
            text.dimmed().to_string()
        }
        StreamEvent::Closed { .. } | StreamEvent::Error { .. } => text.yellow().to_string(),
    }
}
