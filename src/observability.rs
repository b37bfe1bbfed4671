use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("datasonic.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("datasonic.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("datasonic.client.request_duration_seconds");

pub(crate) static SESSION_SENDS: Counter = Counter::new("datasonic.session.sends");
pub(crate) static SESSION_REJECTED_EMPTY: Counter =
    Counter::new("datasonic.session.rejected_empty");
pub(crate) static SESSION_REJECTED_BUSY: Counter = Counter::new("datasonic.session.rejected_busy");
pub(crate) static SESSION_CHAT_FAILURES: Counter = Counter::new("datasonic.session.chat_failures");
pub(crate) static SESSION_IMAGE_FAILURES: Counter =
    Counter::new("datasonic.session.image_failures");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("datasonic.session.turn_duration_seconds");

pub(crate) static INTENT_IMAGE_REQUESTS: Counter = Counter::new("datasonic.intent.image_requests");
pub(crate) static INTENT_PARSE_FAILURES: Counter = Counter::new("datasonic.intent.parse_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_REJECTED_EMPTY);
    collector.register_counter(&SESSION_REJECTED_BUSY);
    collector.register_counter(&SESSION_CHAT_FAILURES);
    collector.register_counter(&SESSION_IMAGE_FAILURES);
    collector.register_moments(&SESSION_TURN_DURATION);

    collector.register_counter(&INTENT_IMAGE_REQUESTS);
    collector.register_counter(&INTENT_PARSE_FAILURES);
}
