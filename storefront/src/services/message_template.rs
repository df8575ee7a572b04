// storefront/src/services/message_template.rs

//! Customer message templates: `{{placeholder}}` tokens plus one
//! `{{#if_delivery}}...{{else}}...{{/if_delivery}}` branch, parsed into segments up front.

use crate::models::{DeliveryType, Order, OrderItem, Store};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("tag pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  CustomerName,
  OrderNumber,
  Total,
  Subtotal,
  DeliveryFee,
  DeliveryType,
  StoreName,
  StorePhone,
  StoreAddress,
  Items,
  DeliveryAddress,
  PaymentMethod,
  ChangeAmount,
  Notes,
}

impl Placeholder {
  const ALL: [Placeholder; 14] = [
    Placeholder::CustomerName,
    Placeholder::OrderNumber,
    Placeholder::Total,
    Placeholder::Subtotal,
    Placeholder::DeliveryFee,
    Placeholder::DeliveryType,
    Placeholder::StoreName,
    Placeholder::StorePhone,
    Placeholder::StoreAddress,
    Placeholder::Items,
    Placeholder::DeliveryAddress,
    Placeholder::PaymentMethod,
    Placeholder::ChangeAmount,
    Placeholder::Notes,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Placeholder::CustomerName => "customer_name",
      Placeholder::OrderNumber => "order_number",
      Placeholder::Total => "total",
      Placeholder::Subtotal => "subtotal",
      Placeholder::DeliveryFee => "delivery_fee",
      Placeholder::DeliveryType => "delivery_type",
      Placeholder::StoreName => "store_name",
      Placeholder::StorePhone => "store_phone",
      Placeholder::StoreAddress => "store_address",
      Placeholder::Items => "items",
      Placeholder::DeliveryAddress => "delivery_address",
      Placeholder::PaymentMethod => "payment_method",
      Placeholder::ChangeAmount => "change_amount",
      Placeholder::Notes => "notes",
    }
  }

  pub fn from_name(name: &str) -> Option<Placeholder> {
    Placeholder::ALL.into_iter().find(|p| p.name() == name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
  IfDelivery { then: Vec<Segment>, otherwise: Vec<Segment> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unknown placeholder '{{{{{0}}}}}'")]
  UnknownPlaceholder(String),
  #[error("conditional blocks cannot be nested")]
  NestedConditional,
  #[error("'{{{{else}}}}' outside a conditional block")]
  UnexpectedElse,
  #[error("conditional block has more than one '{{{{else}}}}'")]
  DuplicateElse,
  #[error("'{{{{/if_delivery}}}}' without a matching opening tag")]
  UnexpectedEnd,
  #[error("conditional block is never closed")]
  Unclosed,
}

/// An open `if_delivery` block while parsing.
struct OpenBlock {
  then: Vec<Segment>,
  otherwise: Option<Vec<Segment>>,
}

impl OpenBlock {
  fn current(&mut self) -> &mut Vec<Segment> {
    match &mut self.otherwise {
      Some(otherwise) => otherwise,
      None => &mut self.then,
    }
  }
}

fn push_literal(target: &mut Vec<Segment>, text: &str) {
  if text.is_empty() {
    return;
  }
  match target.last_mut() {
    Some(Segment::Literal(existing)) => existing.push_str(text),
    _ => target.push(Segment::Literal(text.to_string())),
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
  segments: Vec<Segment>,
}

impl MessageTemplate {
  pub fn parse(source: &str) -> Result<Self, TemplateError> {
    let mut root: Vec<Segment> = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut cursor = 0;

    for tag in TAG.find_iter(source) {
      let literal = &source[cursor..tag.start()];
      cursor = tag.end();
      let target = match open.as_mut() {
        Some(block) => block.current(),
        None => &mut root,
      };
      push_literal(target, literal);

      let raw = tag.as_str();
      let name = raw[2..raw.len() - 2].trim();
      match name {
        "#if_delivery" => {
          if open.is_some() {
            return Err(TemplateError::NestedConditional);
          }
          open = Some(OpenBlock {
            then: Vec::new(),
            otherwise: None,
          });
        }
        "else" => match open.as_mut() {
          Some(block) if block.otherwise.is_none() => block.otherwise = Some(Vec::new()),
          Some(_) => return Err(TemplateError::DuplicateElse),
          None => return Err(TemplateError::UnexpectedElse),
        },
        "/if_delivery" => match open.take() {
          Some(block) => root.push(Segment::IfDelivery {
            then: block.then,
            otherwise: block.otherwise.unwrap_or_default(),
          }),
          None => return Err(TemplateError::UnexpectedEnd),
        },
        other => {
          let placeholder =
            Placeholder::from_name(other).ok_or_else(|| TemplateError::UnknownPlaceholder(other.to_string()))?;
          target.push(Segment::Placeholder(placeholder));
        }
      }
    }

    if open.is_some() {
      return Err(TemplateError::Unclosed);
    }
    push_literal(&mut root, &source[cursor..]);
    Ok(Self { segments: root })
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
    let mut out = String::new();
    render_segments(&self.segments, ctx, &mut out);
    out
  }
}

fn render_segments(segments: &[Segment], ctx: &TemplateContext<'_>, out: &mut String) {
  for segment in segments {
    match segment {
      Segment::Literal(text) => out.push_str(text),
      Segment::Placeholder(p) => out.push_str(&ctx.value(*p)),
      Segment::IfDelivery { then, otherwise } => {
        let branch = if ctx.order.delivery_type == DeliveryType::Delivery {
          then
        } else {
          otherwise
        };
        render_segments(branch, ctx, out);
      }
    }
  }
}

/// The order data a template renders against.
pub struct TemplateContext<'a> {
  pub order: &'a Order,
  pub store: &'a Store,
  pub items: &'a [OrderItem],
}

impl TemplateContext<'_> {
  fn value(&self, placeholder: Placeholder) -> String {
    let order = self.order;
    match placeholder {
      Placeholder::CustomerName => order.customer_name.clone(),
      Placeholder::OrderNumber => order.order_number.to_string(),
      Placeholder::Total => format_brl(order.total_cents),
      Placeholder::Subtotal => format_brl(order.subtotal_cents),
      Placeholder::DeliveryFee => format_brl(order.delivery_fee_cents),
      Placeholder::DeliveryType => delivery_type_label(order.delivery_type).to_string(),
      Placeholder::StoreName => self.store.name.clone(),
      Placeholder::StorePhone => self.store.phone.clone(),
      Placeholder::StoreAddress => self.store.address.clone().unwrap_or_default(),
      Placeholder::Items => format_items(self.items),
      Placeholder::DeliveryAddress => match order.delivery_type {
        DeliveryType::Delivery => order.delivery_address.clone().unwrap_or_default(),
        DeliveryType::Pickup => String::new(),
      },
      Placeholder::PaymentMethod => payment_method_label(&order.payment_method).to_string(),
      Placeholder::ChangeAmount => change_owed_cents(order).map(format_brl).unwrap_or_default(),
      Placeholder::Notes => order.notes.clone().unwrap_or_default(),
    }
  }
}

/// `R$ 1.234,56`, with a leading minus for negative amounts.
pub fn format_brl(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  let reais = (abs / 100).to_string();
  let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
  for (i, ch) in reais.chars().enumerate() {
    if i > 0 && (reais.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  format!("{}R$ {},{:02}", sign, grouped, abs % 100)
}

pub fn delivery_type_label(delivery_type: DeliveryType) -> &'static str {
  match delivery_type {
    DeliveryType::Delivery => "Entrega",
    DeliveryType::Pickup => "Retirada",
  }
}

pub fn payment_method_label(method: &str) -> &str {
  match method {
    "pix" => "PIX",
    "cash" => "Dinheiro",
    "credit_card" => "Cartão de crédito",
    "debit_card" => "Cartão de débito",
    "meal_voucher" => "Vale-refeição",
    other => other,
  }
}

/// Change owed when the customer pays cash with a larger bill.
pub fn change_owed_cents(order: &Order) -> Option<i64> {
  if order.payment_method != "cash" {
    return None;
  }
  order
    .change_for_cents
    .filter(|bill| *bill > order.total_cents)
    .map(|bill| bill - order.total_cents)
}

pub fn format_items(items: &[OrderItem]) -> String {
  let mut lines = Vec::new();
  for item in items {
    lines.push(format!(
      "{}x {} - {}",
      item.quantity,
      item.product_name,
      format_brl(item.line_total_cents())
    ));
    for addon in item.addons.iter() {
      lines.push(format!(
        "  + {}x {} ({})",
        addon.quantity,
        addon.name,
        format_brl(addon.price_cents * i64::from(addon.quantity))
      ));
    }
    if !item.flavors.is_empty() {
      lines.push(format!("  Sabores: {}", item.flavors.join(", ")));
    }
    if let Some(notes) = item.notes.as_deref().filter(|n| !n.trim().is_empty()) {
      lines.push(format!("  Obs: {}", notes));
    }
  }
  lines.join("\n")
}
