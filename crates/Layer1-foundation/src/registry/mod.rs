//! Registry - 인터프리터 전역 런타임 상태
//!
//! - `state.rs` - StateRegistry (키-값 저장소, 생명주기)
//! - `ident.rs` - Identifier 핸들과 well-known 키
//! - `value.rs` - RuntimeValue (타입 소거된 공유 핸들)

mod ident;
mod state;
mod value;

pub use ident::{
    Identifier, RegistryId, WellKnownKey, KEY_ARGV, KEY_PATH, KEY_TRANSFORMERS, KEY_WARNOPTIONS,
    KEY_XOPTIONS,
};
pub use state::{RegistryState, StateRegistry};
pub use value::RuntimeValue;
