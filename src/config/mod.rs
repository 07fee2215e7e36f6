//! Static configuration tables.

mod uuids;

pub use uuids::{
    describe, lissabon_service, LISSABON_BRIGHTNESS, LISSABON_IDENTIFY, LISSABON_IS_ON,
    LISSABON_SERVICE, LISSABON_TEMPERATURE, UUID_NAMES,
};
