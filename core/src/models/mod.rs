// core/src/models/mod.rs

//! Rows of the storefront database and the read models built from them.

pub mod cart;
pub mod product;
pub mod sale;

pub use cart::{Cart, CartItem, CartLine, CartView};
pub use product::Product;
pub use sale::Sale;
