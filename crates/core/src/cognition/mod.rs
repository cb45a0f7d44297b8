pub mod arbitration;
pub mod expression;
pub mod intent;
pub mod normalize;
pub mod session;
