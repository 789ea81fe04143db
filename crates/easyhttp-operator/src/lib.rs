//! EasyHttp operator shell: configuration, CRD installation and the controller runner

pub mod config;
pub mod controller_runner;
pub mod startup;
