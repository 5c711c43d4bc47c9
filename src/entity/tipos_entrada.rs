use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tipos_entrada")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub evento_id: Uuid,
    pub nombre: String,
    pub precio: i64,
    pub descripcion: Option<String>,
    pub cantidad_maxima: i32,
    pub cantidad_disponible: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::eventos::Entity",
        from = "Column::EventoId",
        to = "super::eventos::Column::Id"
    )]
    Eventos,
}

impl Related<super::eventos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Eventos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
