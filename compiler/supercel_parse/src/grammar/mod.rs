//! Grammar productions, implemented as `Parser` methods.

mod expr;
