//! Generic rewrite passes
//!
//! Each pass takes a token stream and returns the rewritten one. Passes
//! compose by feeding one's output into the next:
//!
//! ```
//! use treestream::passes::{adjust_field_type, complete_subst, make_expr};
//! use treestream::template::Template;
//! use treestream::Slot;
//!
//! let toks = Template::from("if (a) b();").tokens(Slot::Top).unwrap();
//! let n = toks.len();
//! let out = complete_subst(toks).unwrap();
//! let out = make_expr(out).unwrap();
//! let out = adjust_field_type(out).unwrap();
//! assert_eq!(out.len(), n);
//! ```

pub mod coerce;
pub mod field_type;
pub mod subst;
pub mod vars;

pub use coerce::make_expr;
pub use field_type::adjust_field_type;
pub use subst::complete_subst;
pub use vars::{all_to_var, hoist_var_decls};
