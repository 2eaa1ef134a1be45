pub mod dispatcher;
pub mod documents;
pub mod negotiation;
pub mod offers;

pub use dispatcher::TaskDispatcher;
pub use negotiation::NegotiationService;
pub use offers::OfferService;
