pub mod basemap;
pub mod capture;
pub mod envi;
pub mod gcp;
pub mod geo;
pub mod m3;
pub mod raster;
