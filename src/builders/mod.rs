mod insert;
mod select;

pub use self::insert::{Insert, InsertWithValues};
pub use self::select::{Select, SelectWithColumns, SelectWithTable};
