pub mod checker;
pub mod diagnostics;
pub mod error;
pub mod inode_table;
pub mod logging;
pub mod logwrapper;
pub mod overlay;
pub mod pretty_print;

#[cfg(test)]
mod test;
