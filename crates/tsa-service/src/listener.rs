//! Notification of newly issued responses

use tsa_types::TimeStampResponseData;

/// Observer invoked after a response was signed and saved
///
/// Listeners run synchronously on the issuing call path and must not
/// block; fan-out to further consumers is their own concern.
pub trait TimeStampListener: Send + Sync {
    /// Called with each newly saved response
    fn on_response(&self, response: &TimeStampResponseData);
}

impl<F> TimeStampListener for F
where
    F: Fn(&TimeStampResponseData) + Send + Sync,
{
    fn on_response(&self, response: &TimeStampResponseData) {
        self(response)
    }
}
