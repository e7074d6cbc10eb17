pub mod blend;
pub mod lexical;
pub mod semantic;
