//! SMS command dispatcher.
//!
//! Maps one [`CommandRequest`] onto a [`PumpService`] operation and sends
//! the replies. Accepted `start`/`stop` get an immediate acknowledgement;
//! the final outcome goes to the pending requester, for `stop` straight
//! away and for `start` when the sequencer finishes.

use log::{info, warn};

use super::commands::{CommandRequest, PumpCommand, Rejection, USAGE};
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink, MessagingPort, StoragePort};
use super::report::format_hours;
use super::service::PumpService;

/// Handle one inbound command to completion.
pub fn dispatch(
    app: &mut PumpService,
    request: &CommandRequest,
    now_ms: u64,
    hw: &mut impl ActuatorPort,
    messenger: &mut impl MessagingPort,
    store: &mut impl StoragePort,
    sink: &mut impl EventSink,
) {
    let from = request.originator.as_str();
    if from.is_empty() {
        warn!("Ignoring command {:?} with no sender address", request.text);
        return;
    }
    info!("SMS from {}: {:?} -> {}", from, request.text, request.command);

    let outcome: Result<(), Rejection> = match request.command {
        PumpCommand::Start => app.request_start(from, now_ms, hw, sink).map(|()| {
            messenger.send(from, "Start command received, cranking engine");
        }),
        PumpCommand::Stop => app
            .request_stop(from, now_ms, hw, store, sink)
            .map(|_| {
                messenger.send(from, "Stop command received");
                let text = format!(
                    "Pump STOPPED. Run hours: {}",
                    format_hours(app.runtime_secs(now_ms))
                );
                if let Some(requester) = app.pending_requester() {
                    messenger.send(requester, &text);
                }
            }),
        PumpCommand::Status => {
            messenger.send(from, &app.status_report(now_ms).to_string());
            Ok(())
        }
        PumpCommand::Runtime => {
            messenger.send(
                from,
                &format!("Engine run hours: {}", format_hours(app.runtime_secs(now_ms))),
            );
            Ok(())
        }
        PumpCommand::Reset => app.reset_fault(hw, sink).map(|()| {
            messenger.send(from, "Fault cleared, pump IDLE");
        }),
        PumpCommand::ClearHours => {
            app.clear_hours(store, sink);
            messenger.send(from, "Run hours cleared");
            Ok(())
        }
        PumpCommand::Unknown => {
            messenger.send(from, USAGE);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => sink.emit(&AppEvent::CommandAccepted {
            command: request.command,
        }),
        Err(reason) => {
            info!("Command {} rejected: {}", request.command, reason.reply());
            messenger.send(from, reason.reply());
            sink.emit(&AppEvent::CommandRejected {
                command: request.command,
                reason,
            });
        }
    }
}
