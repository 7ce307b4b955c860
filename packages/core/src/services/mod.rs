pub mod openfda;
