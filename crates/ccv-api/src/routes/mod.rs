//! Route modules. Each exposes a `router()` merged in [`crate::app`].

pub mod circles;
pub mod ledger;
pub mod members;
pub mod rounds;

use uuid::Uuid;

use ccv_core::CircleId;

pub(crate) fn circle_id(id: Uuid) -> CircleId {
    CircleId::from(id)
}
