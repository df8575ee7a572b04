// storefront/src/services/status_normalizer.rs

use crate::errors::{AppError, Result};
use crate::models::OrderStatus;

/// Localized names clients send for each status. Lookup is exact and case-sensitive.
static STATUS_ALIASES: &[(&str, OrderStatus)] = &[
  ("pendente", OrderStatus::Pending),
  ("aguardando", OrderStatus::Pending),
  ("novo", OrderStatus::Pending),
  ("novo_pedido", OrderStatus::Pending),
  ("em_aberto", OrderStatus::Pending),
  ("confirmado", OrderStatus::Confirmed),
  ("confirmada", OrderStatus::Confirmed),
  ("aceito", OrderStatus::Confirmed),
  ("aprovado", OrderStatus::Confirmed),
  ("preparando", OrderStatus::Preparing),
  ("em_preparo", OrderStatus::Preparing),
  ("em_preparacao", OrderStatus::Preparing),
  ("em_preparação", OrderStatus::Preparing),
  ("separacao", OrderStatus::Preparing),
  ("separação", OrderStatus::Preparing),
  ("producao", OrderStatus::Preparing),
  ("produção", OrderStatus::Preparing),
  ("pronto", OrderStatus::Ready),
  ("pronta", OrderStatus::Ready),
  ("aguardando_retirada", OrderStatus::Ready),
  ("a_caminho", OrderStatus::InDelivery),
  ("saiu_para_entrega", OrderStatus::InDelivery),
  ("em_entrega", OrderStatus::InDelivery),
  ("em_rota", OrderStatus::InDelivery),
  ("entregando", OrderStatus::InDelivery),
  ("entregue", OrderStatus::Delivered),
  ("concluido", OrderStatus::Delivered),
  ("concluído", OrderStatus::Delivered),
  ("finalizado", OrderStatus::Delivered),
  ("finalizada", OrderStatus::Delivered),
  ("cancelado", OrderStatus::Cancelled),
  ("cancelada", OrderStatus::Cancelled),
  ("canceled", OrderStatus::Cancelled),
  ("recusado", OrderStatus::Cancelled),
];

pub fn aliases() -> impl Iterator<Item = (&'static str, OrderStatus)> {
  STATUS_ALIASES.iter().copied()
}

/// Maps an alias or a canonical wire value onto the closed status set.
pub fn normalize_status(raw: &str) -> Result<OrderStatus> {
  if let Some((_, status)) = STATUS_ALIASES.iter().find(|(alias, _)| *alias == raw) {
    return Ok(*status);
  }
  OrderStatus::from_wire(raw).ok_or_else(|| AppError::InvalidStatus(format!("Unknown order status '{}'", raw)))
}
