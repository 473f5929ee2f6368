//! Tabula relational algebra
//!
//! Schema-described datasets (tables or key → value dictionaries) exposed as
//! lazily iterable collections, with projection, selection, cartesian product
//! and three join variants composed on top of them.

pub mod collection;
pub mod error;
pub mod key;
pub mod memory;
pub mod operator;
pub mod optimizer;
pub mod predicate;
pub mod properties;
pub mod value;

pub use collection::{paginate, Catalog, Collection, FilterKind, Filters, Item, ItemIter, Kind};
pub use error::{AlgebraError, Result};
pub use key::{concat, decat, Key};
pub use memory::MemCollection;
pub use operator::{
    CartesianProduct, FieldJoin, JoinType, Operator, PredicateJoin, Projection, Selection,
};
pub use optimizer::JoinStrategy;
pub use predicate::{CmpOp, Operand, Predicate};
pub use properties::{ProductProperties, PropType, Properties, Side};
pub use value::Tuple;
