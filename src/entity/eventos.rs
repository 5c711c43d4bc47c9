use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "eventos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub imagen_url: Option<String>,
    pub fecha_evento: Date,
    pub hora_evento: Option<String>,
    pub ubicacion: Option<String>,
    pub categoria: Option<String>,
    pub precio: Option<i64>,
    pub capacidad_maxima: Option<i32>,
    pub asistentes_actuales: Option<i32>,
    pub organizador_id: Uuid,
    pub organizador_nombre: Option<String>,
    pub estado: String,
    pub etiquetas: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tipos_entrada::Entity")]
    TiposEntrada,
}

impl Related<super::tipos_entrada::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TiposEntrada.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
