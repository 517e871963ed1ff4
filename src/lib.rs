//! cssbundle - Library for bundling stylesheets
//!
//! This library provides functionality to:
//! - Discover `.scss` entry points and compile them with a Sass compiler
//! - Run the compiled CSS through nesting, prefixing, utility-class,
//!   minification, flexbox-fix and downleveling stages
//! - Copy referenced static assets next to the bundles
//! - Rebuild affected bundles when sources change

pub mod build;
pub mod cli;
pub mod config;
pub mod report;
pub mod transform;
pub mod watch;
