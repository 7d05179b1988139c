//! Popup-side delivery state machine.
//!
//! The popup has no acknowledgment channel: a cross-window send is
//! fire-and-forget, and the admin window's listener may not even be attached
//! yet when the popup finishes loading. Delivery therefore runs through
//! several channels — an immediate probe, a delayed direct send, an
//! unconditional persisted copy, and a user-triggered retry — and the machine
//! only has to guarantee that the editor is never left staring at a popup
//! that silently closed without delivering anything.
//!
//! [`Broadcaster`] is the typed model of that machine. The rendered callback
//! page (see [`super::page`]) embeds an inline script that executes the same
//! policy in the browser; both sides share the constants below.

use crate::handshake::message::ExchangeResult;

/// Delay between the `authorizing` probe and the real message. Covers the
/// window where the opener's message listener is not attached yet; sending
/// too early loses the message with no recovery.
pub const PROBE_TO_SEND_DELAY_MS: u64 = 500;

/// Delay between dispatching the message and closing the popup, so the send
/// can flush before the window disappears.
pub const SEND_TO_CLOSE_DELAY_MS: u64 = 300;

/// Well-known same-origin storage key holding the last (un)delivered message.
/// The admin window reads and clears it; storage is the delivery channel of
/// last resort when the opener reference is gone.
pub const FALLBACK_STORAGE_KEY: &str = "cms-oauth-pending";

/// Lightweight progress message sent the moment the popup loads. Primes any
/// storage-change listeners and shows the user something is happening.
pub const PROBE_MESSAGE: &str = "authorizing:github";

/// Status line shown once the message has been dispatched.
pub const DELIVERED_NOTICE: &str = "Close this window; the admin tab will complete sign-in.";

/// Guidance shown when no opener reference is available at load.
pub const NO_OPENER_NOTICE: &str =
    "Sign-in is ready. Return to the admin tab to finish, or press Complete sign-in below.";

/// Phase of the delivery machine.
///
/// The nominal path is `Init -> ProbeSent -> AwaitingDelivery -> Delivered`.
/// Without an opener the machine rests in `AwaitManualRetry` after persisting
/// the message. An error result lands in `DisplayedError` and stays there:
/// the operator needs to read the diagnostic, so that page never auto-closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    /// Probe dispatched; the send timer is running.
    ProbeSent,
    /// Message dispatched and persisted; the close timer is running. Named
    /// for what the popup cannot know: whether the opener actually got it.
    AwaitingDelivery,
    /// Close-and-cleanup has run. Terminal for the automatic flow.
    Delivered,
    /// No opener at load; message persisted, waiting on the user.
    AwaitManualRetry,
    /// Error diagnostic rendered. Terminal, never auto-closes.
    DisplayedError,
}

/// Input to the machine. Timer and click events carry the opener's presence
/// as observed at that moment, since the reference can appear (user clicked
/// retry from a restored window) or vanish (opener navigated away).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Loaded { opener_present: bool },
    DelayElapsed,
    ManualRetry { opener_present: bool },
}

/// Side effects requested from the host page. Sends carry an unrestricted
/// target origin and must fail silently against a closed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendToOpener(String),
    Persist { key: &'static str, value: String },
    StartDelayMs(u64),
    ShowNotice(&'static str),
    ShowError(String),
    CloseWindow,
}

/// State owned by one popup document instance, never shared.
#[derive(Debug)]
pub struct Broadcaster {
    message: String,
    error_text: Option<String>,
    phase: Phase,
    delivered: bool,
}

impl Broadcaster {
    pub fn new(result: &ExchangeResult) -> Self {
        let error_text = match result {
            ExchangeResult::Failure { reason, detail } if detail.is_empty() => {
                Some(reason.clone())
            }
            ExchangeResult::Failure { reason, detail } => Some(format!("{reason}: {detail}")),
            ExchangeResult::Success { .. } => None,
        };

        Self {
            message: result.encode(),
            error_text,
            phase: Phase::Init,
            delivered: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The encoded message, held for the lifetime of the popup. Every channel
    /// carries this identical string.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Advance the machine, returning the side effects to perform in order.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match (self.phase, event) {
            (Phase::Init, Event::Loaded { .. }) if self.error_text.is_some() => {
                self.phase = Phase::DisplayedError;
                let diagnostic = self.error_text.clone().unwrap_or_default();
                vec![Action::ShowError(diagnostic)]
            }
            (Phase::Init, Event::Loaded { opener_present: true }) => {
                self.phase = Phase::ProbeSent;
                vec![
                    Action::SendToOpener(PROBE_MESSAGE.to_string()),
                    Action::StartDelayMs(PROBE_TO_SEND_DELAY_MS),
                ]
            }
            (Phase::Init, Event::Loaded { opener_present: false }) => {
                self.phase = Phase::AwaitManualRetry;
                vec![
                    Action::Persist {
                        key: FALLBACK_STORAGE_KEY,
                        value: self.message.clone(),
                    },
                    Action::ShowNotice(NO_OPENER_NOTICE),
                ]
            }
            (Phase::ProbeSent, Event::DelayElapsed) => self.dispatch(),
            (Phase::AwaitingDelivery, Event::DelayElapsed) => {
                self.phase = Phase::Delivered;
                vec![Action::CloseWindow]
            }
            (_, Event::ManualRetry { opener_present }) if self.phase != Phase::DisplayedError => {
                self.retry(opener_present)
            }
            // Late timers against a delivered or errored popup, retries on an
            // error page: nothing left to do, and racing a closed window must
            // not produce effects.
            _ => Vec::new(),
        }
    }

    /// Send the real message, back it with the persisted copy, and arm the
    /// close timer. The `delivered` guard keeps the close-and-cleanup
    /// sequence single-shot no matter how many sends happen.
    fn dispatch(&mut self) -> Vec<Action> {
        let mut actions = vec![
            Action::SendToOpener(self.message.clone()),
            Action::Persist {
                key: FALLBACK_STORAGE_KEY,
                value: self.message.clone(),
            },
            Action::ShowNotice(DELIVERED_NOTICE),
        ];
        if !self.delivered {
            self.delivered = true;
            self.phase = Phase::AwaitingDelivery;
            actions.push(Action::StartDelayMs(SEND_TO_CLOSE_DELAY_MS));
        }
        actions
    }

    /// User-triggered re-send. Idempotent: the message is re-sent from the
    /// stored copy, not re-derived, and the close sequence stays guarded.
    fn retry(&mut self, opener_present: bool) -> Vec<Action> {
        if opener_present {
            self.dispatch()
        } else {
            vec![
                Action::Persist {
                    key: FALLBACK_STORAGE_KEY,
                    value: self.message.clone(),
                },
                Action::ShowNotice(NO_OPENER_NOTICE),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> ExchangeResult {
        ExchangeResult::success("T")
    }

    fn count_closes(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|action| matches!(action, Action::CloseWindow))
            .count()
    }

    fn count_close_timers(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|action| matches!(action, Action::StartDelayMs(SEND_TO_CLOSE_DELAY_MS)))
            .count()
    }

    #[test]
    fn test_nominal_flow_probe_then_send_then_close() {
        let mut machine = Broadcaster::new(&success());

        let actions = machine.handle(Event::Loaded { opener_present: true });
        assert_eq!(
            actions,
            vec![
                Action::SendToOpener(PROBE_MESSAGE.to_string()),
                Action::StartDelayMs(PROBE_TO_SEND_DELAY_MS),
            ]
        );
        assert_eq!(machine.phase(), Phase::ProbeSent);

        let actions = machine.handle(Event::DelayElapsed);
        assert!(actions.contains(&Action::SendToOpener(machine.message().to_string())));
        assert!(actions.contains(&Action::Persist {
            key: FALLBACK_STORAGE_KEY,
            value: machine.message().to_string(),
        }));
        assert_eq!(machine.phase(), Phase::AwaitingDelivery);

        let actions = machine.handle(Event::DelayElapsed);
        assert_eq!(actions, vec![Action::CloseWindow]);
        assert_eq!(machine.phase(), Phase::Delivered);
    }

    #[test]
    fn test_direct_send_is_backed_by_persisted_copy() {
        // Even a successful direct send must leave a recoverable copy behind.
        let mut machine = Broadcaster::new(&success());
        machine.handle(Event::Loaded { opener_present: true });
        let actions = machine.handle(Event::DelayElapsed);

        let persisted = actions.iter().any(|action| {
            matches!(action, Action::Persist { key, .. } if *key == FALLBACK_STORAGE_KEY)
        });
        assert!(persisted);
    }

    #[test]
    fn test_no_opener_persists_and_never_schedules_close() {
        let mut machine = Broadcaster::new(&success());
        let actions = machine.handle(Event::Loaded { opener_present: false });

        assert_eq!(
            actions,
            vec![
                Action::Persist {
                    key: FALLBACK_STORAGE_KEY,
                    value: machine.message().to_string(),
                },
                Action::ShowNotice(NO_OPENER_NOTICE),
            ]
        );
        assert_eq!(machine.phase(), Phase::AwaitManualRetry);

        // A stray timer changes nothing.
        assert!(machine.handle(Event::DelayElapsed).is_empty());
    }

    #[test]
    fn test_manual_retry_twice_closes_exactly_once() {
        let mut machine = Broadcaster::new(&success());
        machine.handle(Event::Loaded { opener_present: false });

        let mut all_actions = machine.handle(Event::ManualRetry { opener_present: true });
        all_actions.extend(machine.handle(Event::ManualRetry { opener_present: true }));

        // Both retries re-send the identical message...
        let sends = all_actions
            .iter()
            .filter(|action| {
                matches!(&action, Action::SendToOpener(msg) if msg == machine.message())
            })
            .count();
        assert_eq!(sends, 2);

        // ...but the close sequence is armed exactly once.
        assert_eq!(count_close_timers(&all_actions), 1);
        all_actions.extend(machine.handle(Event::DelayElapsed));
        all_actions.extend(machine.handle(Event::DelayElapsed));
        assert_eq!(count_closes(&all_actions), 1);
    }

    #[test]
    fn test_manual_retry_after_auto_delivery_does_not_rearm_close() {
        let mut machine = Broadcaster::new(&success());
        machine.handle(Event::Loaded { opener_present: true });
        machine.handle(Event::DelayElapsed);

        let actions = machine.handle(Event::ManualRetry { opener_present: true });
        assert!(actions.contains(&Action::SendToOpener(machine.message().to_string())));
        assert_eq!(count_close_timers(&actions), 0);
    }

    #[test]
    fn test_manual_retry_without_opener_stays_on_fallback() {
        let mut machine = Broadcaster::new(&success());
        machine.handle(Event::Loaded { opener_present: false });

        let actions = machine.handle(Event::ManualRetry { opener_present: false });
        assert_eq!(
            actions,
            vec![
                Action::Persist {
                    key: FALLBACK_STORAGE_KEY,
                    value: machine.message().to_string(),
                },
                Action::ShowNotice(NO_OPENER_NOTICE),
            ]
        );
        assert_eq!(machine.phase(), Phase::AwaitManualRetry);
    }

    #[test]
    fn test_error_result_displays_and_never_closes() {
        let result = ExchangeResult::failure(
            "provider error",
            r#"{"error":"bad_verification_code"}"#,
        );
        let mut machine = Broadcaster::new(&result);

        let actions = machine.handle(Event::Loaded { opener_present: true });
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::ShowError(diagnostic) => {
                assert!(diagnostic.contains("bad_verification_code"));
            }
            other => panic!("Expected ShowError, got: {:?}", other),
        }
        assert_eq!(machine.phase(), Phase::DisplayedError);

        // Terminal: timers and retries are inert on the error page.
        assert!(machine.handle(Event::DelayElapsed).is_empty());
        assert!(machine
            .handle(Event::ManualRetry { opener_present: true })
            .is_empty());
    }

    #[test]
    fn test_every_channel_carries_the_identical_string() {
        let mut machine = Broadcaster::new(&success());
        let encoded = machine.message().to_string();

        machine.handle(Event::Loaded { opener_present: true });
        let actions = machine.handle(Event::DelayElapsed);

        for action in actions {
            match action {
                Action::SendToOpener(msg) => assert_eq!(msg, encoded),
                Action::Persist { value, .. } => assert_eq!(value, encoded),
                _ => {}
            }
        }
    }
}
