//! Pipeline scenario tests with stub providers.


mod scenarios;
