// Draft pick numbering.

pub mod pick;
