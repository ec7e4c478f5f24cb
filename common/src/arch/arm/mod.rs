pub mod irq;
pub use irq::CortexMIrq;
