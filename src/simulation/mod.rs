//! Random trip generation for stress tests and benchmarks.
