pub mod elf;

pub use elf::load_elf;
