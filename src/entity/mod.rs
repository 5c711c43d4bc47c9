pub mod eventos;
pub mod tipos_entrada;

pub use eventos::Entity as Eventos;
pub use tipos_entrada::Entity as TiposEntrada;
