mod adam;
mod gradient_descent_with_momentum;
mod optimizer;
mod rms_prop;

pub use adam::Adam;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use optimizer::Optimizer;
pub use rms_prop::RmsProp;
