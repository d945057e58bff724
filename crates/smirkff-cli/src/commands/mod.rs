pub mod assign;
pub mod check;
pub mod matching;
