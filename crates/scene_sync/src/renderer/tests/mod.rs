//! Renderer walkthroughs over a real tree, scene and script worker

mod properties;
mod scenarios;
